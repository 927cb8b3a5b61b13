//! Bounded reload backoff for relay failures
//!
//! Each tab gets its own counter. Consecutive failures schedule reloads
//! after the configured delays in order; once they are used up the tab is
//! left showing the error. A successful load resets the counter, and at
//! most one reload is pending per tab.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::session::TabId;

/// Outcome of reporting an error for a tab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// A reload was scheduled
    Scheduled { attempt: usize, delay: Duration },
    /// A reload is already pending
    AlreadyPending,
    /// The last retry was just used up
    Exhausted,
    /// Retries were already used up earlier
    GaveUp,
}

/// Observable retry state of a tab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Idle,
    Pending {
        attempt: usize,
        delay: Duration,
        due: Instant,
    },
    /// A reload fired and its outcome is not known yet
    Reloading { attempt: usize },
    Exhausted,
}

#[derive(Debug, Clone, Copy, Default)]
struct Entry {
    attempts: usize,
    pending: Option<(Duration, Instant)>,
    exhausted: bool,
}

/// Per-tab retry bookkeeping
#[derive(Debug)]
pub struct RetryTracker {
    delays: Vec<Duration>,
    entries: HashMap<TabId, Entry>,
}

impl RetryTracker {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self {
            delays,
            entries: HashMap::new(),
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.delays.len()
    }

    /// Record an error page seen at `now`
    pub fn on_error(&mut self, tab: TabId, now: Instant) -> RetryDecision {
        let entry = self.entries.entry(tab).or_default();
        if entry.pending.is_some() {
            return RetryDecision::AlreadyPending;
        }
        if entry.exhausted {
            return RetryDecision::GaveUp;
        }
        match self.delays.get(entry.attempts) {
            Some(&delay) => {
                entry.attempts += 1;
                entry.pending = Some((delay, now + delay));
                RetryDecision::Scheduled {
                    attempt: entry.attempts,
                    delay,
                }
            }
            None => {
                entry.exhausted = true;
                RetryDecision::Exhausted
            }
        }
    }

    /// A load succeeded: reset the counter and drop any pending reload
    pub fn on_success(&mut self, tab: TabId) {
        self.entries.remove(&tab);
    }

    /// Take every tab whose reload is due at `now`, oldest first
    pub fn take_due(&mut self, now: Instant) -> Vec<TabId> {
        let mut due: Vec<(Instant, TabId)> = self
            .entries
            .iter_mut()
            .filter_map(|(tab, entry)| match entry.pending {
                Some((_, at)) if at <= now => {
                    entry.pending = None;
                    Some((at, *tab))
                }
                _ => None,
            })
            .collect();
        due.sort();
        due.into_iter().map(|(_, tab)| tab).collect()
    }

    /// Forget a tab entirely
    pub fn cancel(&mut self, tab: TabId) {
        self.entries.remove(&tab);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn has_pending(&self) -> bool {
        self.entries.values().any(|e| e.pending.is_some())
    }

    pub fn state(&self, tab: TabId) -> RetryState {
        match self.entries.get(&tab) {
            None => RetryState::Idle,
            Some(entry) => match entry.pending {
                Some((delay, due)) => RetryState::Pending {
                    attempt: entry.attempts,
                    delay,
                    due,
                },
                None if entry.exhausted => RetryState::Exhausted,
                None if entry.attempts == 0 => RetryState::Idle,
                None => RetryState::Reloading {
                    attempt: entry.attempts,
                },
            },
        }
    }
}

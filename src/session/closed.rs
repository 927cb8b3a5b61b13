//! Recently closed tabs

use std::collections::VecDeque;

use super::tab::Tab;

/// Maximum number of retained snapshots
pub const CLOSED_TAB_CAPACITY: usize = 20;

/// Ring buffer of closed-tab snapshots, most recent first
#[derive(Debug, Clone, Default)]
pub struct ClosedTabs {
    entries: VecDeque<Tab>,
}

impl ClosedTabs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a snapshot, dropping the oldest past capacity
    pub fn push(&mut self, tab: Tab) {
        self.entries.push_front(tab);
        self.entries.truncate(CLOSED_TAB_CAPACITY);
    }

    /// Take the most recent snapshot
    pub fn pop(&mut self) -> Option<Tab> {
        self.entries.pop_front()
    }

    pub fn peek(&self) -> Option<&Tab> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tab> {
        self.entries.iter()
    }
}

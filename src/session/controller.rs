//! Outward frame-control surface
//!
//! Settings pages, app launchers and other collaborators open and steer
//! tabs through [`TabController`] with raw input; backend selection stays
//! hidden behind the router. Requests repeated from the same call site
//! within [`DUPLICATE_WINDOW_MS`] are dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use ring::digest;

use super::manager::SessionManager;
use super::tab::{TabId, TabInit};
use crate::router::{Router, is_sentinel};
use crate::utils::Clock;

/// Window in which an identical request from the same call site is a no-op
pub const DUPLICATE_WINDOW_MS: i64 = 1500;

/// Session manager shared between the controller, the UI and the
/// reconciliation loop
pub type SharedSessions = Arc<Mutex<SessionManager>>;

/// Remembers recent navigation requests by idempotency key
#[derive(Debug, Default)]
pub struct DuplicateGuard {
    seen: HashMap<[u8; 32], i64>,
    window_ms: i64,
}

impl DuplicateGuard {
    pub fn new(window_ms: i64) -> Self {
        Self {
            seen: HashMap::new(),
            window_ms,
        }
    }

    /// Idempotency key for a request from a call site
    pub fn key(call_site: &str, request: &str) -> [u8; 32] {
        let mut ctx = digest::Context::new(&digest::SHA256);
        ctx.update(call_site.as_bytes());
        ctx.update(&[0]);
        ctx.update(request.as_bytes());
        let mut key = [0u8; 32];
        key.copy_from_slice(ctx.finish().as_ref());
        key
    }

    /// Returns true when the request should proceed
    pub fn admit(&mut self, call_site: &str, request: &str, now_ms: i64) -> bool {
        let window = self.window_ms;
        self.seen.retain(|_, at| now_ms - *at < window);

        let key = Self::key(call_site, request);
        if self.seen.contains_key(&key) {
            return false;
        }
        self.seen.insert(key, now_ms);
        true
    }
}

/// Entry points for collaborators that need to open or steer tabs
pub struct TabController {
    sessions: SharedSessions,
    router: Arc<Router>,
    clock: Arc<dyn Clock>,
    guard: Mutex<DuplicateGuard>,
}

impl TabController {
    pub fn new(sessions: SharedSessions, router: Arc<Router>, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions,
            router,
            clock,
            guard: Mutex::new(DuplicateGuard::new(DUPLICATE_WINDOW_MS)),
        }
    }

    pub fn sessions(&self) -> &SharedSessions {
        &self.sessions
    }

    /// Open `input` in a new focused tab
    pub fn open_new_tab(&self, input: &str, call_site: &str) -> Option<TabId> {
        let url = self.admit(input, call_site)?;
        let mut sessions = self.lock();
        let id = sessions.add_tab(TabInit::new(url.clone()))?;
        sessions.set_loading(id, !is_sentinel(&url));
        sessions.record_visit(id);
        Some(id)
    }

    /// Navigate a specific tab to `input`
    pub fn update_tab_url(&self, id: TabId, input: &str, call_site: &str) -> bool {
        let Some(url) = self.admit(input, call_site) else {
            return false;
        };
        self.lock().update_url(id, &url, true)
    }

    /// Navigate whichever tab is active; opens one when none exists
    pub fn navigate_active_tab(&self, input: &str, call_site: &str) -> bool {
        let Some(url) = self.admit(input, call_site) else {
            return false;
        };
        let mut sessions = self.lock();
        match sessions.active_tab().map(|t| t.id()) {
            Some(id) => sessions.update_url(id, &url, true),
            None => match sessions.add_tab(TabInit::new(url)) {
                Some(id) => {
                    sessions.record_visit(id);
                    true
                }
                None => false,
            },
        }
    }

    fn admit(&self, input: &str, call_site: &str) -> Option<String> {
        let Some(url) = self.router.request_for(input) else {
            log::debug!("unknown route ignored: {}", input);
            return None;
        };
        let now = self.clock.now_millis();
        let admitted = self
            .guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .admit(call_site, input.trim(), now);
        if !admitted {
            log::debug!("duplicate navigation from {} dropped: {}", call_site, input);
            return None;
        }
        Some(url)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionManager> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

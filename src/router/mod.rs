//! Router/codec: user input to relay request paths and back
//!
//! Pure translation between what the user sees (a literal address, search
//! phrase or `ghost://` route) and what the content frame requests (an
//! internal path or a backend-prefixed request path).

mod backend;
mod classify;
pub mod codec;
mod virtual_route;

pub use backend::{AllowSet, Backend, BackendMode, CatalogEntry, is_local_host, select_backend};
pub use classify::{InputKind, classify, has_scheme, is_passthrough, search_url};
pub use codec::DayKey;
pub use virtual_route::{BLANK, DiscoverTab, GHOST_SCHEME, NEW_TAB, VirtualRoute, is_sentinel};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::Days;

use crate::config::{RouterConfig, ShellOptions};
use crate::storage::normalize_host;
use crate::utils::Clock;

/// Outcome of resolving one piece of input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Empty input: show a new tab
    NewTab,
    /// Internally rendered view
    Internal { route: VirtualRoute, path: String },
    /// Address loaded without a backend
    Passthrough(String),
    /// Address wrapped for a relay backend
    Relayed {
        literal: String,
        backend: Backend,
        request: String,
    },
    /// `ghost://` address with no matching route
    Unknown(String),
}

impl Resolution {
    /// The url a content frame should load; `None` for unknown routes
    pub fn url(&self) -> Option<&str> {
        match self {
            Resolution::NewTab => Some(NEW_TAB),
            Resolution::Internal { path, .. } => Some(path),
            Resolution::Passthrough(url) => Some(url),
            Resolution::Relayed { request, .. } => Some(request),
            Resolution::Unknown(_) => None,
        }
    }

    pub fn into_url(self) -> Option<String> {
        match self {
            Resolution::NewTab => Some(NEW_TAB.to_string()),
            Resolution::Internal { path, .. } => Some(path),
            Resolution::Passthrough(url) => Some(url),
            Resolution::Relayed { request, .. } => Some(request),
            Resolution::Unknown(_) => None,
        }
    }
}

/// Caches the XOR key so it is derived once per calendar day
struct DayKeyCache {
    host: String,
    current: Mutex<Option<DayKey>>,
}

impl DayKeyCache {
    fn new(host: String) -> Self {
        Self {
            host,
            current: Mutex::new(None),
        }
    }

    fn key(&self, clock: &dyn Clock) -> DayKey {
        let today = clock.today();
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        match current.as_ref() {
            Some(key) if key.day() == today => key.clone(),
            _ => {
                log::debug!("deriving codec key for {}", today);
                let key = DayKey::derive(today, &self.host);
                *current = Some(key.clone());
                key
            }
        }
    }

    fn previous(&self, clock: &dyn Clock) -> Option<DayKey> {
        let yesterday = clock.today().checked_sub_days(Days::new(1))?;
        Some(DayKey::derive(yesterday, &self.host))
    }
}

/// Translates between literal addresses and backend request paths
pub struct Router {
    config: RouterConfig,
    options: RwLock<ShellOptions>,
    allow: AllowSet,
    direct_ready: AtomicBool,
    keys: DayKeyCache,
    clock: Arc<dyn Clock>,
}

impl Router {
    /// Create a router; the direct backend starts not ready
    pub fn new(config: RouterConfig, options: ShellOptions, clock: Arc<dyn Clock>) -> Self {
        let allow = AllowSet::from_hosts(&config.direct_hosts);
        let keys = DayKeyCache::new(authority_of(&config.origin));
        Self {
            config,
            options: RwLock::new(options),
            allow,
            direct_ready: AtomicBool::new(false),
            keys,
            clock,
        }
    }

    /// Union the games catalog hosts into the direct allow-set
    pub fn with_catalog(mut self, catalog: &[CatalogEntry]) -> Self {
        self.allow = self.allow.with_catalog(catalog);
        self
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Snapshot of the current options
    pub fn options(&self) -> ShellOptions {
        self.options
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the options (after the settings component changed them)
    pub fn set_options(&self, options: ShellOptions) {
        *self.options.write().unwrap_or_else(PoisonError::into_inner) = options;
    }

    /// Mark the direct backend ready or not
    pub fn set_direct_ready(&self, ready: bool) {
        self.direct_ready.store(ready, Ordering::SeqCst);
    }

    pub fn direct_ready(&self) -> bool {
        self.direct_ready.load(Ordering::SeqCst)
    }

    pub fn allow_set(&self) -> &AllowSet {
        &self.allow
    }

    /// Today's XOR key
    pub fn day_key(&self) -> DayKey {
        self.keys.key(self.clock.as_ref())
    }

    /// Resolve raw input to something a frame can load
    pub fn resolve(&self, input: &str) -> Resolution {
        match classify(input) {
            InputKind::Empty => Resolution::NewTab,
            InputKind::Virtual(VirtualRoute::NewTab) => Resolution::NewTab,
            InputKind::Virtual(route) => Resolution::Internal {
                route,
                path: self.internal_path(route),
            },
            InputKind::UnknownRoute(raw) => Resolution::Unknown(raw),
            InputKind::Passthrough(raw) => Resolution::Passthrough(raw),
            InputKind::Url(literal) => self.relay(literal),
            InputKind::Search(phrase) => {
                let engine = self.options().engine;
                self.relay(search_url(&engine, &phrase))
            }
        }
    }

    /// Resolve straight to a loadable url
    pub fn request_for(&self, input: &str) -> Option<String> {
        self.resolve(input).into_url()
    }

    /// Backend the current options pick for a literal address
    pub fn select_backend(&self, literal: &str) -> Backend {
        let host = host_of(literal);
        select_backend(
            self.options().pr_type,
            host.as_deref(),
            &self.allow,
            self.direct_ready(),
        )
    }

    /// Encode a literal address into a full request url for `backend`
    pub fn encode(&self, literal: &str, backend: Backend) -> String {
        let (prefix, payload) = match backend {
            Backend::Masked => (
                self.config.masked_prefix.as_str(),
                codec::xor_encode(literal, &self.day_key()),
            ),
            Backend::Direct => (
                self.config.direct_prefix.as_str(),
                codec::percent_encode(literal),
            ),
        };
        format!("{}{}{}", self.request_origin(), prefix, payload)
    }

    /// Reverse a request url to its literal address. Never fails: anything
    /// that cannot be decoded comes back as-is (minus a trailing slash).
    pub fn decode(&self, url: &str) -> String {
        if is_passthrough(url) || is_sentinel(url) || self.is_internal(url) {
            return url.to_string();
        }

        if let Some(payload) = payload_after(url, &self.config.masked_prefix) {
            if let Some(literal) = self.unmask(payload) {
                return trim_trailing_slash(literal);
            }
            log::trace!("masked payload undecodable, falling back: {}", url);
        } else if let Some(payload) = payload_after(url, &self.config.direct_prefix) {
            if let Some(literal) = codec::percent_decode(payload) {
                return trim_trailing_slash(literal);
            }
        }

        let fallback = codec::percent_decode(url).unwrap_or_else(|| url.to_string());
        trim_trailing_slash(fallback)
    }

    /// What the address bar shows for a tab url
    pub fn display_address(&self, url: &str) -> String {
        if url.is_empty() || url == NEW_TAB {
            return String::new();
        }
        if let Some(route) = self.internal_route(url) {
            return route.display();
        }
        self.decode(url)
    }

    /// Check whether a url is an internally rendered view
    pub fn is_internal(&self, url: &str) -> bool {
        self.internal_route(url).is_some()
    }

    /// Check whether a literal address points at the shell's own origin
    pub fn is_same_origin(&self, literal: &str) -> bool {
        match (host_of(literal), host_of(&self.config.origin)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    fn internal_route(&self, url: &str) -> Option<VirtualRoute> {
        if !url.contains(&self.config.internal_flag) {
            return None;
        }
        let local = self.config.origin.trim_end_matches('/');
        if url.contains("://") && !url.starts_with(local) {
            return None;
        }
        VirtualRoute::from_internal_path(url)
    }

    fn internal_path(&self, route: VirtualRoute) -> String {
        format!("{}?{}", route.path(), self.config.internal_flag)
    }

    fn relay(&self, literal: String) -> Resolution {
        let backend = self.select_backend(&literal);
        let request = self.encode(&literal, backend);
        Resolution::Relayed {
            literal,
            backend,
            request,
        }
    }

    /// Origin backend requests are assembled against
    fn request_origin(&self) -> String {
        let options = self.options();
        let origin = options
            .remote_origin()
            .unwrap_or(self.config.origin.as_str());
        origin.trim_end_matches('/').to_string()
    }

    fn unmask(&self, payload: &str) -> Option<String> {
        let payload = payload.trim_end_matches('/');
        let today = codec::xor_decode(payload, &self.day_key());
        if let Some(decoded) = today.filter(|s| has_scheme(s) || is_passthrough(s)) {
            return Some(decoded);
        }
        // Paths minted before midnight still decode for a day
        let previous = self.keys.previous(self.clock.as_ref())?;
        codec::xor_decode(payload, &previous).filter(|s| has_scheme(s))
    }
}

/// Normalized hostname of a literal address
pub fn host_of(literal: &str) -> Option<String> {
    let parsed = url::Url::parse(literal).ok()?;
    parsed.host_str().map(normalize_host)
}

/// `host[:port]` of an origin, used as codec key material
fn authority_of(origin: &str) -> String {
    match url::Url::parse(origin) {
        Ok(parsed) => match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            _ => origin.to_string(),
        },
        Err(_) => origin.to_string(),
    }
}

fn payload_after<'a>(url: &'a str, prefix: &str) -> Option<&'a str> {
    let start = url.find(prefix)? + prefix.len();
    Some(&url[start..])
}

fn trim_trailing_slash(mut s: String) -> String {
    if s.len() > 1 && s.ends_with('/') {
        s.pop();
    }
    s
}

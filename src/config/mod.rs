//! Configuration records
//!
//! `ShellOptions` is the global options record shared with the settings
//! component. It is stored as JSON under [`OPTIONS_KEY`] and read on demand;
//! the remaining structs are process-local tunables with defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::router::BackendMode;
use crate::storage::KeyValueStore;
use crate::utils::Result;
use crate::utils::error::StorageError;

/// Key under which the options record is persisted
pub const OPTIONS_KEY: &str = "options";

/// Default search engine prefix
pub const DEFAULT_SEARCH_ENGINE: &str = "https://www.google.com/search?q=";

/// Global options record owned by the settings component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShellOptions {
    /// Backend selection mode
    pub pr_type: BackendMode,
    /// Search engine prefix (or template with `%s`)
    pub engine: String,
    /// Manually configured transport endpoint, bypassing discovery
    pub w_server: Option<String>,
    /// Route backend requests through `remote_proxy_server`
    pub proxy_routing: bool,
    /// Remote origin used when `proxy_routing` is on
    pub remote_proxy_server: Option<String>,
    /// Global ad blocking default
    pub ad_block: bool,
    /// Global popup blocking default
    pub popup_block: bool,
    /// Global download blocking default
    pub download_block: bool,
    /// Persist the tab collection on every mutation
    pub save_tabs: bool,
}

impl Default for ShellOptions {
    fn default() -> Self {
        Self {
            pr_type: BackendMode::Auto,
            engine: DEFAULT_SEARCH_ENGINE.to_string(),
            w_server: None,
            proxy_routing: false,
            remote_proxy_server: None,
            ad_block: true,
            popup_block: true,
            download_block: false,
            save_tabs: true,
        }
    }
}

impl ShellOptions {
    /// Read the options record, falling back to defaults when absent or unreadable
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let Some(raw) = store.get(OPTIONS_KEY) else {
            return Self::default();
        };
        match serde_json::from_str(&raw) {
            Ok(options) => options,
            Err(e) => {
                log::warn!("options record unreadable, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Write the options record
    pub fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        let raw = serde_json::to_string(self).map_err(|source| StorageError::Serialize {
            key: OPTIONS_KEY.to_string(),
            source,
        })?;
        store.set(OPTIONS_KEY, raw);
        Ok(())
    }

    /// Remote origin to use for backend requests, if remote routing is active
    pub fn remote_origin(&self) -> Option<&str> {
        if !self.proxy_routing {
            return None;
        }
        self.remote_proxy_server
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Router tunables
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Origin the shell is served from, e.g. `http://localhost:8080`
    pub origin: String,
    /// Path prefix of the XOR-masked backend
    pub masked_prefix: String,
    /// Path prefix of the percent-encoded backend
    pub direct_prefix: String,
    /// Query flag appended to internally rendered paths
    pub internal_flag: String,
    /// Hostnames that prefer the direct backend in automatic mode
    pub direct_hosts: Vec<String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:8080".to_string(),
            masked_prefix: "/service/".to_string(),
            direct_prefix: "/relay/".to_string(),
            internal_flag: "internal=1".to_string(),
            direct_hosts: vec![
                "discord.com".to_string(),
                "youtube.com".to_string(),
                "spotify.com".to_string(),
                "twitch.tv".to_string(),
                "now.gg".to_string(),
            ],
        }
    }
}

/// Reconciliation loop tunables
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Interval of the shared sweep timer
    pub sweep_interval: Duration,
    /// Delay before each successive retry; its length is the retry budget
    pub retry_delays: Vec<Duration>,
    /// Selectors whose presence marks a relay-rendered error page
    pub error_markers: Vec<String>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_millis(220),
            retry_delays: vec![
                Duration::from_millis(1500),
                Duration::from_millis(3000),
                Duration::from_millis(6000),
            ],
            error_markers: vec![
                "#relay-error".to_string(),
                "#errorTitle".to_string(),
                "[data-relay-error]".to_string(),
            ],
        }
    }
}

/// Transport discovery tunables
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Global deadline for the whole race
    pub deadline: Duration,
    /// Components joined to form the list passphrase
    pub passphrase_parts: Vec<String>,
    /// PBKDF2 iteration count
    pub pbkdf2_iterations: u32,
}

impl DiscoveryConfig {
    /// Passphrase used to open the candidate list
    pub fn passphrase(&self) -> String {
        self.passphrase_parts.concat()
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(10),
            passphrase_parts: vec![
                "gh".to_string(),
                "0st".to_string(),
                "-relay".to_string(),
                "-list".to_string(),
            ],
            pbkdf2_iterations: 100_000,
        }
    }
}

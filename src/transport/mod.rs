//! Relay transport discovery
//!
//! Finds one reachable WebSocket endpoint out of a published candidate list.

mod candidates;
mod discovery;
mod probe;

pub use candidates::{CandidateFetcher, SealedList, is_websocket_url, open_list, seal_list};
pub use discovery::{Discovered, discover};
pub use probe::{TransportConnection, TransportProbe, WebSocketProbe};

use std::sync::Arc;

use crate::config::{DiscoveryConfig, ShellOptions};
use crate::utils::Result;

/// Discovery entry point combining list retrieval and the probe race
pub struct TransportDiscovery {
    config: DiscoveryConfig,
    probe: Arc<dyn TransportProbe>,
}

impl TransportDiscovery {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self::with_probe(config, Arc::new(WebSocketProbe))
    }

    pub fn with_probe(config: DiscoveryConfig, probe: Arc<dyn TransportProbe>) -> Self {
        Self { config, probe }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Race a list that is already in hand
    pub async fn race(&self, candidates: Vec<String>) -> Result<String> {
        let found = discover(candidates, Arc::clone(&self.probe), self.config.deadline).await?;
        Ok(found.into_endpoint().await)
    }

    /// Resolve the transport endpoint for these options
    ///
    /// A configured `wServer` is used as is. Otherwise the sealed lists at
    /// `list_urls` are fetched and their endpoints raced.
    pub async fn resolve(&self, options: &ShellOptions, list_urls: &[&str]) -> Result<String> {
        if let Some(server) = options.w_server.as_deref().filter(|s| !s.trim().is_empty()) {
            log::debug!("using configured transport endpoint {}", server);
            return Ok(server.trim().to_string());
        }
        let fetcher = CandidateFetcher::new(self.config.clone())?;
        let candidates = fetcher.fetch_all(list_urls).await?;
        self.race(candidates).await
    }
}

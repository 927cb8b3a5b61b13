//! Relay backend selection

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::storage::normalize_host;

/// Backend selection mode from the options record (`prType`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Masked unless the host is in the direct allow-set and the direct backend is ready
    #[default]
    Auto,
    /// Always the masked backend
    Masked,
    /// Always the direct backend
    Direct,
}

/// A relay backend, identified by its path encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Address is XOR-masked with the daily key and hex-encoded
    Masked,
    /// Address is percent-encoded
    Direct,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Masked => "masked",
            Backend::Direct => "direct",
        }
    }
}

/// One entry of the games catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub url: String,
}

/// Hostnames routed to the direct backend in automatic mode
#[derive(Debug, Clone, Default)]
pub struct AllowSet {
    hosts: HashSet<String>,
}

impl AllowSet {
    /// Build from a static host list
    pub fn from_hosts<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            hosts: hosts
                .into_iter()
                .map(|h| normalize_host(h.as_ref()))
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    /// Union in every non-local hostname referenced by a catalog
    pub fn with_catalog(mut self, catalog: &[CatalogEntry]) -> Self {
        for entry in catalog {
            if let Some(host) = catalog_host(&entry.url) {
                self.hosts.insert(host);
            }
        }
        self
    }

    pub fn contains(&self, host: &str) -> bool {
        self.hosts.contains(&normalize_host(host))
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

/// Hostname of an absolute, non-local catalog url
fn catalog_host(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let host = parsed.host_str()?;
    if is_local_host(host) {
        return None;
    }
    Some(normalize_host(host))
}

/// Loopback and unqualified hosts
pub fn is_local_host(host: &str) -> bool {
    let host = host.trim_matches(['[', ']']);
    host.eq_ignore_ascii_case("localhost")
        || host.ends_with(".localhost")
        || host == "::1"
        || host.starts_with("127.")
        || host == "0.0.0.0"
}

/// Pick a backend for a literal address
pub fn select_backend(
    mode: BackendMode,
    host: Option<&str>,
    allow: &AllowSet,
    direct_ready: bool,
) -> Backend {
    match mode {
        BackendMode::Masked => Backend::Masked,
        BackendMode::Direct => Backend::Direct,
        BackendMode::Auto => match host {
            Some(host) if direct_ready && allow.contains(host) => Backend::Direct,
            _ => Backend::Masked,
        },
    }
}

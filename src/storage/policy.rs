//! Per-site content policy table

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{KeyValueStore, read_json, write_json};
use crate::config::ShellOptions;
use crate::utils::Result;

/// Key under which site policies are persisted
pub const SITE_POLICY_KEY: &str = "sitePolicies";

/// Content policy kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    Ad,
    Popup,
    Download,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 3] = [PolicyKind::Ad, PolicyKind::Popup, PolicyKind::Download];

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::Ad => "adBlock",
            PolicyKind::Popup => "popupBlock",
            PolicyKind::Download => "downloadBlock",
        }
    }
}

/// Overrides for one hostname; `None` means "use the global default"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitePolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_block: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popup_block: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_block: Option<bool>,
}

impl SitePolicy {
    pub fn get(&self, kind: PolicyKind) -> Option<bool> {
        match kind {
            PolicyKind::Ad => self.ad_block,
            PolicyKind::Popup => self.popup_block,
            PolicyKind::Download => self.download_block,
        }
    }

    pub fn set(&mut self, kind: PolicyKind, value: Option<bool>) {
        match kind {
            PolicyKind::Ad => self.ad_block = value,
            PolicyKind::Popup => self.popup_block = value,
            PolicyKind::Download => self.download_block = value,
        }
    }

    /// True when every field defers to the global default
    pub fn is_empty(&self) -> bool {
        PolicyKind::ALL.iter().all(|k| self.get(*k).is_none())
    }
}

/// Resolved policy after applying global defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EffectivePolicy {
    pub ad_block: bool,
    pub popup_block: bool,
    pub download_block: bool,
}

impl EffectivePolicy {
    /// Policy that enforces nothing
    pub const NONE: EffectivePolicy = EffectivePolicy {
        ad_block: false,
        popup_block: false,
        download_block: false,
    };

    pub fn defaults(options: &ShellOptions) -> Self {
        Self {
            ad_block: options.ad_block,
            popup_block: options.popup_block,
            download_block: options.download_block,
        }
    }

    pub fn enabled(&self, kind: PolicyKind) -> bool {
        match kind {
            PolicyKind::Ad => self.ad_block,
            PolicyKind::Popup => self.popup_block,
            PolicyKind::Download => self.download_block,
        }
    }
}

/// Normalize a hostname or address to a policy key: no scheme, no port,
/// no path, no leading `www.`, lowercase
pub fn normalize_host(input: &str) -> String {
    let trimmed = input.trim();
    let without_scheme = trimmed
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(trimmed);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host = host.rsplit_once('@').map(|(_, h)| h).unwrap_or(host);
    let host = match host.rsplit_once(':') {
        Some((h, port)) if port.chars().all(|c| c.is_ascii_digit()) => h,
        _ => host,
    };
    let host = host.to_ascii_lowercase();
    host.strip_prefix("www.").map(str::to_string).unwrap_or(host)
}

/// Site policy table persisted through a key/value store
///
/// No caching: every call reads the record, so one enforcement pass should
/// call [`SitePolicyTable::snapshot`] once and resolve hosts against it.
pub struct SitePolicyTable {
    store: Arc<dyn KeyValueStore>,
}

impl SitePolicyTable {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Read the whole table
    pub fn snapshot(&self) -> HashMap<String, SitePolicy> {
        read_json(self.store.as_ref(), SITE_POLICY_KEY).unwrap_or_default()
    }

    /// Overrides for one host
    pub fn get(&self, host: &str) -> SitePolicy {
        self.snapshot()
            .get(&normalize_host(host))
            .copied()
            .unwrap_or_default()
    }

    /// Set or clear one override (read-modify-write)
    pub fn set(&self, host: &str, kind: PolicyKind, value: Option<bool>) -> Result<()> {
        let key = normalize_host(host);
        let mut table = self.snapshot();
        let entry = table.entry(key.clone()).or_default();
        entry.set(kind, value);
        if entry.is_empty() {
            table.remove(&key);
        }
        log::debug!("site policy {} {} = {:?}", key, kind.as_str(), value);
        write_json(self.store.as_ref(), SITE_POLICY_KEY, &table)
    }

    /// Resolve the policy for a host against global defaults
    pub fn effective(&self, host: &str, options: &ShellOptions) -> EffectivePolicy {
        resolve_policy(&self.snapshot(), host, options)
    }
}

/// Resolve a host against an already-read table
pub fn resolve_policy(
    table: &HashMap<String, SitePolicy>,
    host: &str,
    options: &ShellOptions,
) -> EffectivePolicy {
    let defaults = EffectivePolicy::defaults(options);
    let Some(site) = table.get(&normalize_host(host)) else {
        return defaults;
    };
    EffectivePolicy {
        ad_block: site.ad_block.unwrap_or(defaults.ad_block),
        popup_block: site.popup_block.unwrap_or(defaults.popup_block),
        download_block: site.download_block.unwrap_or(defaults.download_block),
    }
}

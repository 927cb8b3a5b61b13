//! Encrypted relay candidate list
//!
//! The list is published as JSON `{salt, iv, data}` (base64 fields). The
//! key comes from PBKDF2-HMAC-SHA256 over a passphrase assembled from fixed
//! components, and `data` is AES-256-GCM ciphertext of a JSON array of
//! endpoint urls. Since the passphrase ships with the client this only
//! keeps the list out of plain sight; it is not a secret.

use std::num::NonZeroU32;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::pbkdf2;
use serde::{Deserialize, Serialize};

use crate::config::DiscoveryConfig;
use crate::utils::Result;
use crate::utils::error::TransportError;

/// Sealed candidate list as published
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedList {
    pub salt: String,
    pub iv: String,
    pub data: String,
}

fn derive_key(passphrase: &str, salt: &[u8], iterations: u32) -> Result<LessSafeKey> {
    let iterations = NonZeroU32::new(iterations)
        .ok_or_else(|| crate::utils::ShellError::Config("pbkdf2 iterations must be > 0".into()))?;
    let mut key = [0u8; 32];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        salt,
        passphrase.as_bytes(),
        &mut key,
    );
    let unbound = UnboundKey::new(&AES_256_GCM, &key).map_err(|_| TransportError::Decrypt)?;
    Ok(LessSafeKey::new(unbound))
}

fn decode_field(value: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(value.trim())
        .map_err(|e| TransportError::MalformedList(e.to_string()).into())
}

/// Decrypt a sealed list into websocket endpoint urls
pub fn open_list(sealed: &SealedList, passphrase: &str, iterations: u32) -> Result<Vec<String>> {
    let salt = decode_field(&sealed.salt)?;
    let iv = decode_field(&sealed.iv)?;
    let mut data = decode_field(&sealed.data)?;

    let key = derive_key(passphrase, &salt, iterations)?;
    let nonce = Nonce::try_assume_unique_for_key(&iv).map_err(|_| TransportError::Decrypt)?;
    let plain = key
        .open_in_place(nonce, Aad::empty(), &mut data)
        .map_err(|_| TransportError::Decrypt)?;

    let endpoints: Vec<String> = serde_json::from_slice(plain)
        .map_err(|e| TransportError::MalformedList(e.to_string()))?;
    let valid: Vec<String> = endpoints
        .into_iter()
        .map(|e| e.trim().to_string())
        .filter(|e| {
            let ok = is_websocket_url(e);
            if !ok {
                log::warn!("skipping non-websocket candidate {}", e);
            }
            ok
        })
        .collect();

    if valid.is_empty() {
        return Err(TransportError::MalformedList("no websocket endpoints".to_string()).into());
    }
    Ok(valid)
}

/// Encrypt a list of endpoints (used to publish lists)
pub fn seal_list(
    endpoints: &[String],
    passphrase: &str,
    iterations: u32,
    salt: &[u8],
    iv: [u8; NONCE_LEN],
) -> Result<SealedList> {
    let key = derive_key(passphrase, salt, iterations)?;
    let mut data = serde_json::to_vec(endpoints)
        .map_err(|e| TransportError::MalformedList(e.to_string()))?;
    key.seal_in_place_append_tag(Nonce::assume_unique_for_key(iv), Aad::empty(), &mut data)
        .map_err(|_| TransportError::Decrypt)?;

    Ok(SealedList {
        salt: STANDARD.encode(salt),
        iv: STANDARD.encode(iv),
        data: STANDARD.encode(&data),
    })
}

/// Check for a `ws://` or `wss://` url
pub fn is_websocket_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    (lower.starts_with("ws://") || lower.starts_with("wss://")) && url::Url::parse(url).is_ok()
}

/// Fetches and opens the published candidate list
pub struct CandidateFetcher {
    client: reqwest::Client,
    config: DiscoveryConfig,
}

impl CandidateFetcher {
    pub fn new(config: DiscoveryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ghostshell/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| TransportError::Fetch(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Download and decrypt the list at `url`
    pub async fn fetch(&self, url: &str) -> Result<Vec<String>> {
        log::debug!("fetching candidate list from {}", url);
        let sealed: SealedList = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| TransportError::Fetch(e.to_string()))?
            .json()
            .await
            .map_err(|e| TransportError::MalformedList(e.to_string()))?;

        open_list(
            &sealed,
            &self.config.passphrase(),
            self.config.pbkdf2_iterations,
        )
    }

    /// Fetch several mirrors concurrently and merge their endpoints
    ///
    /// Fails only when every mirror fails, with the first mirror's error.
    pub async fn fetch_all(&self, urls: &[&str]) -> Result<Vec<String>> {
        let lists = futures::future::join_all(urls.iter().map(|url| self.fetch(url))).await;

        let mut merged: Vec<String> = Vec::new();
        let mut first_error = None;
        for (url, list) in urls.iter().zip(lists) {
            match list {
                Ok(endpoints) => {
                    for endpoint in endpoints {
                        if !merged.contains(&endpoint) {
                            merged.push(endpoint);
                        }
                    }
                }
                Err(e) => {
                    log::warn!("candidate list {} unavailable: {}", url, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match (merged.is_empty(), first_error) {
            (true, Some(e)) => Err(e),
            (true, None) => Err(TransportError::Unavailable.into()),
            (false, _) => Ok(merged),
        }
    }
}

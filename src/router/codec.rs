//! Request-path codecs
//!
//! The masked backend XORs the UTF-8 bytes of the literal address with a
//! daily key and hex-encodes the result. This is obfuscation against casual
//! inspection of request paths, NOT encryption: the key is derived from
//! public inputs (the date and the serving host) and anyone who reads this
//! code can reverse it. Do not rely on it to keep addresses secret.
//!
//! The direct backend uses plain percent-encoding.

use chrono::NaiveDate;
use ring::digest;

/// XOR key valid for one calendar day
#[derive(Clone, PartialEq, Eq)]
pub struct DayKey {
    day: NaiveDate,
    bytes: [u8; 32],
}

impl DayKey {
    /// Derive the key for `day` from SHA-256 of the day string and host
    pub fn derive(day: NaiveDate, host: &str) -> Self {
        let material = format!("{}|{}", day.format("%Y-%m-%d"), host);
        let hash = digest::digest(&digest::SHA256, material.as_bytes());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(hash.as_ref());
        Self { day, bytes }
    }

    pub fn day(&self) -> NaiveDate {
        self.day
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for DayKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DayKey").field("day", &self.day).finish_non_exhaustive()
    }
}

/// Mask and hex-encode an address
pub fn xor_encode(input: &str, key: &DayKey) -> String {
    let masked: Vec<u8> = input
        .as_bytes()
        .iter()
        .zip(key.as_bytes().iter().cycle())
        .map(|(b, k)| b ^ k)
        .collect();
    to_hex(&masked)
}

/// Reverse [`xor_encode`]; `None` on malformed hex or non-UTF-8 output
pub fn xor_decode(hex: &str, key: &DayKey) -> Option<String> {
    let masked = from_hex(hex)?;
    let bytes: Vec<u8> = masked
        .iter()
        .zip(key.as_bytes().iter().cycle())
        .map(|(b, k)| b ^ k)
        .collect();
    String::from_utf8(bytes).ok()
}

/// Percent-encode an address as a single path component
pub fn percent_encode(input: &str) -> String {
    urlencoding::encode(input).into_owned()
}

/// Percent-decode; `None` when the result is not valid UTF-8
pub fn percent_decode(input: &str) -> Option<String> {
    urlencoding::decode(input).ok().map(|s| s.into_owned())
}

fn to_hex(bytes: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(DIGITS[(b >> 4) as usize] as char);
        out.push(DIGITS[(b & 0x0f) as usize] as char);
    }
    out
}

fn from_hex(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    hex.as_bytes()
        .chunks(2)
        .map(|pair| {
            let hi = (pair[0] as char).to_digit(16)?;
            let lo = (pair[1] as char).to_digit(16)?;
            Some((hi * 16 + lo) as u8)
        })
        .collect()
}

//! Address-bar input classification

use std::sync::LazyLock;

use regex::Regex;

use super::virtual_route::{GHOST_SCHEME, VirtualRoute};

static SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[a-z][a-z0-9+.\-]*://").expect("valid scheme regex"));

static LOCALHOST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^localhost(?::\d{1,5})?(?:[/?#]\S*)?$").expect("valid localhost regex")
});

static HOSTNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[a-z0-9\-]+\.)+[a-z0-9\-]+(?::\d{1,5})?(?:[/?#]\S*)?$")
        .expect("valid hostname regex")
});

/// Schemes that are never wrapped by a backend
const PASSTHROUGH_SCHEMES: [&str; 3] = ["data:", "blob:", "about:"];

/// What a piece of user input turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    /// Nothing typed
    Empty,
    /// Known internal route
    Virtual(VirtualRoute),
    /// `ghost://` address with no matching route
    UnknownRoute(String),
    /// `data:`, `blob:` or `about:` address, used verbatim
    Passthrough(String),
    /// Literal URL, scheme included
    Url(String),
    /// Search phrase
    Search(String),
}

/// Classify raw input
pub fn classify(input: &str) -> InputKind {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return InputKind::Empty;
    }

    if has_prefix_ignore_case(trimmed, GHOST_SCHEME) {
        return match VirtualRoute::parse(trimmed) {
            Some(route) => InputKind::Virtual(route),
            None => InputKind::UnknownRoute(trimmed.to_string()),
        };
    }

    if is_passthrough(trimmed) {
        return InputKind::Passthrough(trimmed.to_string());
    }

    if has_scheme(trimmed) {
        return InputKind::Url(trimmed.to_string());
    }

    if LOCALHOST_RE.is_match(trimmed) {
        return InputKind::Url(format!("http://{}", trimmed));
    }

    if HOSTNAME_RE.is_match(trimmed) {
        return InputKind::Url(format!("https://{}", trimmed));
    }

    InputKind::Search(trimmed.to_string())
}

/// Check for a `scheme://` prefix
pub fn has_scheme(input: &str) -> bool {
    SCHEME_RE.is_match(input)
}

/// Check for a scheme that bypasses backend wrapping
pub fn is_passthrough(input: &str) -> bool {
    PASSTHROUGH_SCHEMES
        .iter()
        .any(|scheme| has_prefix_ignore_case(input.trim_start(), scheme))
}

/// Build a search URL from an engine prefix or `%s` template
pub fn search_url(engine: &str, phrase: &str) -> String {
    let encoded = urlencoding::encode(phrase);
    if engine.contains("%s") {
        engine.replacen("%s", &encoded, 1)
    } else {
        format!("{}{}", engine, encoded)
    }
}

fn has_prefix_ignore_case(input: &str, prefix: &str) -> bool {
    input
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

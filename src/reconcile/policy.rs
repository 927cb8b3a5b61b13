//! Per-site content policy enforcement
//!
//! Each blocker installs at most one long-lived stylesheet, observer or
//! click listener per document (guarded by a marker on the document) and
//! afterwards only toggles it, so applying a policy on every sweep never
//! stacks duplicates.

use super::frame::FrameDocument;
use crate::storage::PolicyKind;

/// Stylesheet id carrying the ad-hiding rules
pub const AD_STYLE_ID: &str = "ghost-adblock-style";
/// Mutation observer id for ad removal
pub const AD_OBSERVER_ID: &str = "ghost-adblock-observer";
const AD_SWEPT_MARKER: &str = "ghostAdSwept";
const POPUP_MARKER: &str = "ghostPopupGuard";
const DOWNLOAD_MARKER: &str = "ghostDownloadGuard";

/// Structural and attribute selectors associated with advertising
pub const AD_SELECTORS: &[&str] = &[
    "iframe[src*='doubleclick']",
    "iframe[src*='googlesyndication']",
    "ins.adsbygoogle",
    "[id^='google_ads']",
    "[id^='div-gpt-ad']",
    "[class*='ad-banner']",
    "[class*='ad-container']",
    "[class*='sponsored']",
    "[data-ad-slot]",
    "[data-ad-client]",
    "[aria-label='Advertisement']",
    ".adsbox",
    ".ad-slot",
];

/// File extensions treated as downloads
pub const DOWNLOAD_EXTENSIONS: &[&str] = &[
    "exe", "msi", "dmg", "pkg", "deb", "rpm", "apk", "appimage", "zip", "rar", "7z", "tar", "gz",
    "bz2", "xz", "iso", "img", "bin", "jar", "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
    "torrent",
];

/// Mouse button that triggered a click
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// Anchor click as seen by a document-level listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorClick {
    pub href: String,
    pub target: Option<String>,
    /// Anchor declares a `download` attribute
    pub download: bool,
    pub button: MouseButton,
}

impl AnchorClick {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            target: None,
            download: false,
            button: MouseButton::Left,
        }
    }
}

/// Click listener installed by the popup and download blockers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClickGuard {
    Popup,
    Download,
}

impl ClickGuard {
    /// Decide whether an enabled guard cancels this click
    pub fn should_block(&self, click: &AnchorClick) -> bool {
        match self {
            ClickGuard::Popup => {
                click.button == MouseButton::Middle
                    || click
                        .target
                        .as_deref()
                        .is_some_and(|t| t.eq_ignore_ascii_case("_blank"))
            }
            ClickGuard::Download => click.download || has_download_extension(&click.href),
        }
    }
}

fn has_download_extension(href: &str) -> bool {
    let path = href.split(['?', '#']).next().unwrap_or_default();
    let file = path.rsplit('/').next().unwrap_or_default();
    match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => DOWNLOAD_EXTENSIONS
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext)),
        _ => false,
    }
}

/// One enforcement strategy for a policy kind
pub trait ContentPolicyEnforcer: Send + Sync {
    fn kind(&self) -> PolicyKind;

    /// Enable enforcement; must be idempotent
    fn install(&self, doc: &mut dyn FrameDocument);

    /// Disable enforcement; must be idempotent
    fn teardown(&self, doc: &mut dyn FrameDocument);

    fn apply(&self, doc: &mut dyn FrameDocument, enabled: bool) {
        if enabled {
            self.install(doc);
        } else {
            self.teardown(doc);
        }
    }
}

/// Hides, removes and keeps removing ad elements
#[derive(Debug, Default)]
pub struct AdBlocker;

impl AdBlocker {
    /// Stylesheet hiding every ad selector
    pub fn stylesheet() -> String {
        format!("{} {{ display: none !important; }}", AD_SELECTORS.join(",\n"))
    }
}

impl ContentPolicyEnforcer for AdBlocker {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Ad
    }

    fn install(&self, doc: &mut dyn FrameDocument) {
        if !doc.has_style(AD_STYLE_ID) {
            doc.insert_style(AD_STYLE_ID, &Self::stylesheet());
            log::debug!("ad-block stylesheet installed");
        }
        if !doc.has_marker(AD_SWEPT_MARKER) {
            let removed = doc.remove_matching(AD_SELECTORS);
            doc.set_marker(AD_SWEPT_MARKER);
            log::trace!("removed {} ad elements", removed);
        }
        if !doc.has_observer(AD_OBSERVER_ID) {
            doc.observe_mutations(AD_OBSERVER_ID, AD_SELECTORS);
        }
    }

    fn teardown(&self, doc: &mut dyn FrameDocument) {
        if doc.has_style(AD_STYLE_ID) {
            doc.remove_style(AD_STYLE_ID);
            log::debug!("ad-block stylesheet removed");
        }
        if doc.has_observer(AD_OBSERVER_ID) {
            doc.disconnect_observer(AD_OBSERVER_ID);
        }
    }
}

/// Blocks scripted windows and new-window anchor clicks
#[derive(Debug, Default)]
pub struct PopupBlocker;

impl ContentPolicyEnforcer for PopupBlocker {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Popup
    }

    fn install(&self, doc: &mut dyn FrameDocument) {
        if !doc.has_marker(POPUP_MARKER) {
            doc.add_click_guard(ClickGuard::Popup);
            doc.set_marker(POPUP_MARKER);
        }
        doc.set_guard_enabled(ClickGuard::Popup, true);
        doc.set_window_open_blocked(true);
    }

    fn teardown(&self, doc: &mut dyn FrameDocument) {
        if doc.has_marker(POPUP_MARKER) {
            doc.set_guard_enabled(ClickGuard::Popup, false);
        }
        doc.set_window_open_blocked(false);
    }
}

/// Cancels clicks on download links
#[derive(Debug, Default)]
pub struct DownloadBlocker;

impl ContentPolicyEnforcer for DownloadBlocker {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Download
    }

    fn install(&self, doc: &mut dyn FrameDocument) {
        if !doc.has_marker(DOWNLOAD_MARKER) {
            doc.add_click_guard(ClickGuard::Download);
            doc.set_marker(DOWNLOAD_MARKER);
        }
        doc.set_guard_enabled(ClickGuard::Download, true);
    }

    fn teardown(&self, doc: &mut dyn FrameDocument) {
        if doc.has_marker(DOWNLOAD_MARKER) {
            doc.set_guard_enabled(ClickGuard::Download, false);
        }
    }
}

/// The three blockers, one per [`PolicyKind`]
pub fn default_enforcers() -> Vec<Box<dyn ContentPolicyEnforcer>> {
    vec![
        Box::new(AdBlocker),
        Box::new(PopupBlocker),
        Box::new(DownloadBlocker),
    ]
}

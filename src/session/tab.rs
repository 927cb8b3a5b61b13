//! Tab records

use serde::{Deserialize, Serialize};

use crate::router::NEW_TAB;

/// Unique tab identifier, never reused within a session manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TabId(u64);

impl TabId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tab-{}", self.0)
    }
}

/// One logical browsing session
///
/// Fields are read-only outside the session module; every change goes
/// through a [`super::SessionManager`] action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub(super) id: TabId,
    pub(super) url: String,
    pub(super) title: String,
    pub(super) history: Vec<String>,
    pub(super) history_index: usize,
    pub(super) active: bool,
    pub(super) is_loading: bool,
    #[serde(default)]
    pub(super) pinned: bool,
    #[serde(default)]
    pub(super) group: Option<String>,
}

impl Tab {
    pub(super) fn from_init(id: TabId, init: TabInit) -> Self {
        Self {
            id,
            history: vec![init.url.clone()],
            url: init.url,
            title: init.title,
            history_index: 0,
            active: init.active,
            is_loading: false,
            pinned: init.pinned,
            group: init.group,
        }
    }

    pub fn id(&self) -> TabId {
        self.id
    }

    /// Current request-shaped location
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn history_index(&self) -> usize {
        self.history_index
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn can_go_back(&self) -> bool {
        self.history_index > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.history_index + 1 < self.history.len()
    }

    /// Check if the tab shows the new-tab page
    pub fn is_new_tab(&self) -> bool {
        self.url == NEW_TAB
    }
}

/// Initial state for a new tab
#[derive(Debug, Clone)]
pub struct TabInit {
    pub url: String,
    pub title: String,
    pub active: bool,
    pub pinned: bool,
    pub group: Option<String>,
}

impl TabInit {
    /// Active tab at `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Open without taking focus
    pub fn background(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

impl Default for TabInit {
    fn default() -> Self {
        Self {
            url: NEW_TAB.to_string(),
            title: "New Tab".to_string(),
            active: true,
            pinned: false,
            group: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_from_init() {
        let tab = Tab::from_init(TabId::new(7), TabInit::new("/home?internal=1").background());
        assert_eq!(tab.id(), TabId::new(7));
        assert_eq!(tab.history(), ["/home?internal=1".to_string()]);
        assert_eq!(tab.history_index(), 0);
        assert!(!tab.is_active());
        assert!(!tab.is_loading());
        assert!(!tab.can_go_back());
        assert!(!tab.can_go_forward());
    }

    #[test]
    fn test_default_init_is_new_tab() {
        let tab = Tab::from_init(TabId::new(1), TabInit::default());
        assert!(tab.is_new_tab());
        assert_eq!(tab.title(), "New Tab");
    }

    #[test]
    fn test_tab_serializes_camel_case() {
        let tab = Tab::from_init(TabId::new(3), TabInit::new("x").in_group("work"));
        let json = serde_json::to_string(&tab).unwrap();
        assert!(json.contains("\"historyIndex\":0"));
        assert!(json.contains("\"isLoading\":false"));
        assert!(json.contains("\"group\":\"work\""));
    }
}

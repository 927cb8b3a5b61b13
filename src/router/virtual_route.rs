//! Internal `ghost://` routes
//!
//! Virtual routes map straight to in-application views. They are never
//! handed to a relay backend.

/// Reserved internal scheme
pub const GHOST_SCHEME: &str = "ghost://";

/// Tab url of a fresh, empty tab
pub const NEW_TAB: &str = "ghost://newtab";

/// Blank document sentinel
pub const BLANK: &str = "about:blank";

/// Sub-tabs of the discover view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscoverTab {
    Games,
    Apps,
    Movies,
    Music,
}

impl DiscoverTab {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoverTab::Games => "games",
            DiscoverTab::Apps => "apps",
            DiscoverTab::Movies => "movies",
            DiscoverTab::Music => "music",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "games" => Some(DiscoverTab::Games),
            "apps" => Some(DiscoverTab::Apps),
            "movies" => Some(DiscoverTab::Movies),
            "music" => Some(DiscoverTab::Music),
            _ => None,
        }
    }
}

/// An internal application view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VirtualRoute {
    Home,
    Apps,
    Settings,
    Discover(Option<DiscoverTab>),
    Docs,
    Search,
    Code,
    Ai,
    Remote,
    NewTab,
}

impl VirtualRoute {
    /// Parse a `ghost://<route>[/<sub>]` address. Case-insensitive; query
    /// and fragment suffixes are ignored. Unknown routes yield `None`.
    pub fn parse(input: &str) -> Option<Self> {
        let lowered = input.trim().to_ascii_lowercase();
        let rest = lowered.strip_prefix(GHOST_SCHEME)?;
        Self::from_segments(rest)
    }

    /// Reverse lookup from an internally rendered path such as
    /// `/settings?internal=1` or `http://localhost:8080/discover/games`.
    pub fn from_internal_path(path: &str) -> Option<Self> {
        let lowered = path.trim().to_ascii_lowercase();
        let path = match lowered.split_once("://") {
            Some((_, rest)) if !lowered.starts_with('/') => {
                rest.find('/').map(|i| &rest[i..]).unwrap_or("/")
            }
            _ => lowered.as_str(),
        };
        let path = path.strip_prefix('/')?;
        match Self::from_segments(path)? {
            VirtualRoute::NewTab => None,
            route => Some(route),
        }
    }

    fn from_segments(rest: &str) -> Option<Self> {
        let rest = rest.split(['?', '#']).next().unwrap_or_default();
        let rest = rest.trim_end_matches('/');
        let (name, sub) = match rest.split_once('/') {
            Some((name, sub)) => (name, Some(sub)),
            None => (rest, None),
        };

        let route = match name {
            "home" => VirtualRoute::Home,
            "apps" => VirtualRoute::Apps,
            "settings" | "options" => VirtualRoute::Settings,
            "discover" | "entertainment" => {
                let tab = match sub {
                    Some(sub) => Some(DiscoverTab::parse(sub)?),
                    None => None,
                };
                return Some(VirtualRoute::Discover(tab));
            }
            "docs" => VirtualRoute::Docs,
            "search" => VirtualRoute::Search,
            "code" => VirtualRoute::Code,
            "ai" => VirtualRoute::Ai,
            "remote" => VirtualRoute::Remote,
            "newtab" | "new" | "" => VirtualRoute::NewTab,
            _ => return None,
        };

        // Only discover takes a sub-route
        if sub.is_some() {
            return None;
        }
        Some(route)
    }

    /// Application path this route renders at, without the internal flag
    pub fn path(&self) -> String {
        match self {
            VirtualRoute::Home => "/home".to_string(),
            VirtualRoute::Apps => "/apps".to_string(),
            VirtualRoute::Settings => "/settings".to_string(),
            VirtualRoute::Discover(None) => "/discover".to_string(),
            VirtualRoute::Discover(Some(tab)) => format!("/discover/{}", tab.as_str()),
            VirtualRoute::Docs => "/docs".to_string(),
            VirtualRoute::Search => "/search".to_string(),
            VirtualRoute::Code => "/code".to_string(),
            VirtualRoute::Ai => "/ai".to_string(),
            VirtualRoute::Remote => "/remote".to_string(),
            VirtualRoute::NewTab => NEW_TAB.to_string(),
        }
    }

    /// Address-bar form, e.g. `ghost://discover/games`
    pub fn display(&self) -> String {
        match self {
            VirtualRoute::NewTab => NEW_TAB.to_string(),
            other => format!("{}{}", GHOST_SCHEME, other.path().trim_start_matches('/')),
        }
    }
}

/// Check whether a tab url is the new-tab or blank sentinel
pub fn is_sentinel(url: &str) -> bool {
    url.is_empty() || url == NEW_TAB || url.eq_ignore_ascii_case(BLANK)
}

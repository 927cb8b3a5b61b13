//! Tab session engine
//!
//! A finite-state machine per tab (idle / loading, with errors tracked by
//! the reconciliation loop) plus collection-level invariants, exposed as
//! atomic actions on [`SessionManager`].

mod closed;
mod controller;
mod manager;
mod tab;
mod zoom;

pub use closed::{CLOSED_TAB_CAPACITY, ClosedTabs};
pub use controller::{DUPLICATE_WINDOW_MS, DuplicateGuard, SharedSessions, TabController};
pub use manager::{MAX_TABS, SAVED_TABS_KEY, SessionManager, SessionSnapshot};
pub use tab::{Tab, TabId, TabInit};
pub use zoom::{
    DEFAULT_ZOOM, MAX_ZOOM, MIN_ZOOM, ZOOM_STEP, ZoomLevel, ZoomSurface, ZoomTransform,
};

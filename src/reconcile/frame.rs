//! Ports onto embedded content frames
//!
//! A content frame renders relayed pages the shell cannot inspect directly.
//! Reads go through these traits so a cross-origin refusal or a detached
//! frame surfaces as a [`FrameAccessError`] the loop can skip over.

use thiserror::Error;

use super::policy::ClickGuard;
use crate::session::{TabId, ZoomSurface};

/// Reasons a frame read was refused
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAccessError {
    #[error("frame content is cross-origin")]
    CrossOrigin,

    #[error("frame is detached")]
    Detached,
}

/// Document loaded in a content frame
pub trait FrameDocument {
    /// Whether the document finished loading
    fn is_loaded(&self) -> bool;

    /// Whether any element matches one of `selectors`
    fn matches_any(&self, selectors: &[&str]) -> bool;

    fn has_marker(&self, marker: &str) -> bool;

    /// Flag the document so an install step runs at most once
    fn set_marker(&mut self, marker: &str);

    fn has_style(&self, id: &str) -> bool;

    fn insert_style(&mut self, id: &str, css: &str);

    fn remove_style(&mut self, id: &str);

    /// Remove every element matching `selectors`, returning how many went
    fn remove_matching(&mut self, selectors: &[&str]) -> usize;

    fn has_observer(&self, id: &str) -> bool;

    /// Keep removing matches of `selectors` as the document mutates
    fn observe_mutations(&mut self, id: &str, selectors: &[&str]);

    fn disconnect_observer(&mut self, id: &str);

    /// Attach a document-level click listener for `guard`
    fn add_click_guard(&mut self, guard: ClickGuard);

    fn set_guard_enabled(&mut self, guard: ClickGuard, enabled: bool);

    /// Swap the frame's window-opening primitive for a no-op, or restore it
    fn set_window_open_blocked(&mut self, blocked: bool);
}

/// An embedded content frame
pub trait ContentFrame: ZoomSurface {
    /// Current address of the frame
    fn location(&self) -> Result<String, FrameAccessError>;

    fn title(&self) -> Result<String, FrameAccessError>;

    fn document(&mut self) -> Result<&mut dyn FrameDocument, FrameAccessError>;

    fn navigate(&mut self, url: &str);
}

/// Looks up the frame rendering a tab
pub trait FrameHost {
    fn frame(&mut self, tab: TabId) -> Option<&mut dyn ContentFrame>;
}

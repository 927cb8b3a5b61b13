//! Reconciliation between tab records and their content frames
//!
//! Keeps each tab's url and title in step with what its frame actually
//! shows, reloads relay failures with bounded backoff, and enforces per-site
//! content policy.

mod frame;
mod observe;
mod policy;
mod retry;
mod sweep;

pub use frame::{ContentFrame, FrameAccessError, FrameDocument, FrameHost};
pub use observe::{ChannelObserver, FrameMessage, Observation, ObservedLocation, PollingObserver};
pub use policy::{
    AD_OBSERVER_ID, AD_SELECTORS, AD_STYLE_ID, AdBlocker, AnchorClick, ClickGuard,
    ContentPolicyEnforcer, DOWNLOAD_EXTENSIONS, DownloadBlocker, MouseButton, PopupBlocker,
    default_enforcers,
};
pub use retry::{RetryDecision, RetryState, RetryTracker};
pub use sweep::{ReconciliationLoop, SweepReport};

//! # Ghostshell - relay browsing shell core
//!
//! The logic behind a browser-in-a-page shell that loads sites through
//! relay backends inside embedded content frames.
//!
//! ## Architecture
//!
//! The core is organized into the following modules:
//!
//! - **router**: Turns typed input into relay request paths and back
//! - **session**: Tab collection, history cursors, zoom and closed tabs
//! - **transport**: Discovery of a reachable relay transport endpoint
//! - **reconcile**: Sweeps frames for url/title drift, relay errors and site policy
//! - **storage**: Key/value persistence for options, history, site policy and sessions
//! - **config**: Persisted options and component tunables
//! - **testing**: In-memory fakes for the frame and clock ports (`testing` feature)
//! - **utils**: Shared utilities and error types

pub mod config;
pub mod reconcile;
pub mod router;
pub mod session;
pub mod storage;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;
pub mod utils;

// Re-export main types for convenience
pub use config::ShellOptions;
pub use reconcile::ReconciliationLoop;
pub use router::{Resolution, Router};
pub use session::{SessionManager, TabController, TabId};
pub use transport::TransportDiscovery;
pub use utils::error::{Result, ShellError};

/// Shell version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = "Ghostshell";

//! Shared utilities: error types and the clock port

pub mod clock;
pub mod error;

pub use clock::{Clock, SystemClock};
pub use error::{Result, ShellError};

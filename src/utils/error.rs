//! Error types for the shell core

use thiserror::Error;

/// Main error type for shell operations
#[derive(Debug, Error)]
pub enum ShellError {
    /// Relay transport errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    /// Persisted key/value errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    /// Invalid configuration value
    #[error("Config error: {0}")]
    Config(String),
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Transport discovery errors
#[derive(Debug, Error)]
pub enum TransportError {
    /// Every candidate failed or the deadline elapsed first
    #[error("no relay transport endpoint found")]
    Unavailable,
    /// A single connection attempt failed
    #[error("connect to {endpoint} failed: {reason}")]
    Connect { endpoint: String, reason: String },
    /// The candidate list could not be fetched
    #[error("candidate list fetch failed: {0}")]
    Fetch(String),
    /// The candidate list could not be decrypted
    #[error("candidate list decryption failed")]
    Decrypt,
    /// The decrypted payload was not a list of endpoints
    #[error("malformed candidate list: {0}")]
    MalformedList(String),
}

/// Storage-specific errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Record could not be (de)serialized
    #[error("serialization failed for {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    /// Backing file could not be read or written
    #[error("storage I/O failed: {0}")]
    Io(String),
}

/// Convenience Result type for shell operations
pub type Result<T> = std::result::Result<T, ShellError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_unavailable_display() {
        let err: ShellError = TransportError::Unavailable.into();
        assert_eq!(
            err.to_string(),
            "Transport error: no relay transport endpoint found"
        );
    }

    #[test]
    fn test_connect_error_names_endpoint() {
        let err = TransportError::Connect {
            endpoint: "wss://relay.example/ws".to_string(),
            reason: "refused".to_string(),
        };
        assert!(err.to_string().contains("wss://relay.example/ws"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ShellError = io.into();
        assert!(matches!(err, ShellError::Io(_)));
    }
}

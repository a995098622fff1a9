//! Browserdeck error types

use thiserror::Error;

/// Browserdeck error type
#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected before any side effect
    #[error("Validation error: {0}")]
    Validation(String),

    /// A launch was attempted while a run is active
    #[error("A task run is already active")]
    AlreadyRunning,

    /// Configuration error (missing credential, unreadable file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A remote service call (session, agent start/stop, scrape) failed
    #[error("Remote call failed: {0}")]
    RemoteCall(String),

    /// Stream channel open, keep-alive, or decode failure
    #[error("Stream error: {0}")]
    Stream(String),

    /// Intentional user stop; not a fault
    #[error("Stopped by user")]
    Cancelled,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for browserdeck operations
pub type Result<T> = std::result::Result<T, Error>;

//! Error types for gatehouse-ac
//!
//! Defines daemon-specific error types using thiserror for clear error
//! propagation. Store failures surface here only until the dispatcher
//! converts them into a `Decision::Error`; nothing in the scan pipeline
//! throws past the dispatcher.

use thiserror::Error;

/// Main error type for the gatehouse-ac daemon
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Document store request failed (transient or after exhausting the
    /// retry budget)
    #[error("Store error: {0}")]
    Store(String),

    /// Channel transport endpoint failed to initialize
    #[error("Failed to open channel endpoint: {0}")]
    PortOpen(String),

    /// Channel output sink failed after the write retry budget
    #[error("Channel write failed: {0}")]
    ChannelWrite(String),

    /// File or stream I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using gatehouse-ac Error
pub type Result<T> = std::result::Result<T, Error>;

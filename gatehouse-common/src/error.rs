//! Common error types for Gatehouse

use crate::tag::TagParseError;
use thiserror::Error;

/// Common result type for Gatehouse operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared across Gatehouse crates
#[derive(Error, Debug)]
pub enum Error {
    /// Scan payload failed tag validation (wraps TagParseError)
    #[error("Invalid tag: {0}")]
    InvalidTag(#[from] TagParseError),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

//! Error types for Sightline Core
//!
//! Nothing in the translation path raises across the public boundary;
//! the bridge degrades by omission. These errors surface only from the
//! beacon transport.

use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Bridge error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Beacon transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

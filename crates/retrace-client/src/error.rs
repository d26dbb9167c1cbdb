//! Error types for retrace-client

use thiserror::Error;

/// Outbound HTTP client adapter error type
#[derive(Debug, Error)]
pub enum Error {
    /// Engine error (missing context, replay exhaustion, ...)
    #[error("engine error: {0}")]
    Core(#[from] retrace_core::Error),

    /// Real request failure (capture and off modes pass these through)
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The recorded call failed originally; its failure is reproduced
    #[error("replayed backend failure: {0}")]
    Replayed(String),

    /// The recorded value could not be turned back into a response
    #[error("invalid recorded response: {0}")]
    InvalidRecord(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

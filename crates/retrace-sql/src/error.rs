//! Error types for retrace-sql

use thiserror::Error;

/// Outbound SQL adapter error type
#[derive(Debug, Error)]
pub enum Error {
    /// Engine error (missing context, replay exhaustion, ...)
    #[error("engine error: {0}")]
    Core(#[from] retrace_core::Error),

    /// Real database failure (capture and off modes pass these through)
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The recorded call failed originally; its failure is reproduced
    #[error("replayed database failure: {0}")]
    Replayed(String),

    /// The recorded value could not be turned back into a typed result
    #[error("invalid recorded result: {0}")]
    InvalidRecord(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

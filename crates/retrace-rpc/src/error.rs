//! Error types for retrace-rpc

use thiserror::Error;

/// Outbound RPC adapter error type
#[derive(Debug, Error)]
pub enum Error {
    /// Engine error (missing context, replay exhaustion, ...)
    #[error("engine error: {0}")]
    Core(#[from] retrace_core::Error),

    /// Real transport failure (capture and off modes pass these through)
    #[error("transport error: {0}")]
    Transport(String),

    /// The recorded call failed originally; its failure is reproduced
    #[error("replayed rpc failure: {0}")]
    Replayed(String),

    /// The recorded value could not be turned back into a typed result
    #[error("invalid recorded result: {0}")]
    InvalidRecord(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

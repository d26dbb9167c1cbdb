//! Error types for retrace-core

use thiserror::Error;

/// Core engine error type
#[derive(Debug, Error)]
pub enum Error {
    /// The interception protocol was invoked without an established execution
    /// context. This is distinct from running with recording switched off: a
    /// missing context means an adapter skipped the capture lifecycle.
    #[error("no execution context established for this call chain")]
    ContextMissing,

    /// An unrecognized mode name reached the engine (configuration/parse
    /// boundary, or a protocol invariant violation).
    #[error("invalid mode: {0}")]
    InvalidMode(String),

    /// A replay consumed past the end of the recorded dependency sequence.
    /// Signals drift between the original capture and the current code path.
    #[error("replay exhausted after {consumed} dependency record(s); no record left for {operation}")]
    ReplayExhausted {
        /// Operation of the call that found no record
        operation: String,
        /// Number of records consumed before exhaustion
        consumed: usize,
    },

    /// No recorded dependencies exist for the requested test id
    #[error("unknown test case: {0}")]
    UnknownTestCase(String),

    /// Failure while buffering request/response bytes
    #[error("capture i/o error: {0}")]
    CaptureIo(String),

    /// Replay store or capture sink failure
    #[error("store error: {0}")]
    Store(String),

    /// Recorded value could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid recorder configuration
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

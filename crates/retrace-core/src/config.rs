//! Config - recorder settings

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default replay marker header
pub const DEFAULT_REPLAY_HEADER: &str = "x-retrace-test-id";

/// Default cap on buffered request/response bodies (bytes)
pub const DEFAULT_MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Recorder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Application name stamped on captured test cases
    pub app: String,
    /// Header carrying the replay test identifier
    pub replay_header: String,
    /// Cap on buffered request/response body size
    pub max_body_bytes: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            app: "app".to_string(),
            replay_header: DEFAULT_REPLAY_HEADER.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl RecorderConfig {
    /// Create a config for the named application, defaults elsewhere
    #[must_use]
    pub fn new(app: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            ..Self::default()
        }
    }

    /// Override the replay marker header
    #[must_use]
    pub fn with_replay_header(mut self, header: impl Into<String>) -> Self {
        self.replay_header = header.into();
        self
    }

    /// Override the body buffering cap
    #[must_use]
    pub fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }

    /// Load settings from `RETRACE_`-prefixed environment variables
    /// (`RETRACE_APP`, `RETRACE_REPLAY_HEADER`, `RETRACE_MAX_BODY_BYTES`),
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("RETRACE").try_parsing(true))
            .build()
            .map_err(|e| Error::Configuration(e.to_string()))?
            .try_deserialize()
            .map_err(|e| Error::Configuration(e.to_string()))
    }
}

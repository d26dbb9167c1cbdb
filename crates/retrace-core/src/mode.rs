//! Mode - execution modes and the process-wide recording switch
//!
//! Every inbound request runs in exactly one of three modes. The mode is
//! decided once, when the request's execution context is built, and never
//! changes for the lifetime of that request.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Execution mode for one inbound request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Interception disabled; all calls go to the real handler/dependency
    Off,
    /// Real calls execute and their inputs/outputs are recorded
    Capture,
    /// Dependency calls are answered from recorded data
    Replay,
}

impl Mode {
    /// Returns the string representation of the mode
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Capture => "capture",
            Self::Replay => "replay",
        }
    }

    /// Whether this mode performs no interception at all
    #[must_use]
    pub fn is_off(&self) -> bool {
        matches!(self, Self::Off)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(Self::Off),
            "capture" => Ok(Self::Capture),
            "replay" => Ok(Self::Replay),
            other => Err(Error::InvalidMode(other.to_string())),
        }
    }
}

// ============================================================================
// Process-wide recording switch
// ============================================================================

/// Environment variable consulted by [`init_recording_from_env`]
pub const RECORDING_ENV: &str = "RETRACE_RECORDING";

static RECORDING_ENABLED: AtomicBool = AtomicBool::new(false);

/// Enable or disable recording process-wide.
///
/// Intended to be called once at startup, before traffic is served. When
/// disabled, every adapter is a zero-overhead pass-through and no capture
/// state is allocated.
pub fn set_recording_enabled(enabled: bool) {
    RECORDING_ENABLED.store(enabled, Ordering::Relaxed);
}

/// Whether recording is enabled process-wide.
///
/// Read-only on the hot path; a relaxed atomic load.
#[must_use]
pub fn recording_enabled() -> bool {
    RECORDING_ENABLED.load(Ordering::Relaxed)
}

/// Initialize the recording switch from `RETRACE_RECORDING`.
///
/// Accepts `1`/`true`/`on`/`yes` (case-insensitive) as enabled; anything
/// else, including an unset variable, leaves recording off.
pub fn init_recording_from_env() {
    let enabled = std::env::var(RECORDING_ENV)
        .map(|v| {
            let v = v.to_ascii_lowercase();
            matches!(v.as_str(), "1" | "true" | "on" | "yes")
        })
        .unwrap_or(false);
    set_recording_enabled(enabled);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_roundtrip() {
        for mode in [Mode::Off, Mode::Capture, Mode::Replay] {
            let s = mode.to_string();
            let parsed: Mode = s.parse().unwrap();
            assert_eq!(mode, parsed);
        }
    }

    #[test]
    fn test_invalid_mode_is_reported() {
        let err = "record".parse::<Mode>().unwrap_err();
        assert!(matches!(err, Error::InvalidMode(ref m) if m == "record"));
    }

    #[test]
    fn test_mode_serialization() {
        let json = serde_json::to_string(&Mode::Capture).unwrap();
        assert_eq!(json, r#""capture""#);
        let parsed: Mode = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Mode::Capture);
    }
}

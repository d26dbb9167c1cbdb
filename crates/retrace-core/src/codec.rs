//! Codec - binary payload encoding for JSON-carried records
//!
//! Captured bodies and messages are raw bytes; records travel as JSON. Byte
//! fields are base64-encoded, either through the serde helpers here
//! (`#[serde(with = "retrace_core::codec::base64_bytes")]`) or the explicit
//! functions for adapters that manage encoding themselves.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{Error, Result};

/// Encode bytes to a base64 string
#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a base64 string back to bytes
pub fn decode(encoded: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(encoded)
        .map_err(|e| Error::Serialization(format!("invalid base64 payload: {e}")))
}

/// Serde adapter serializing `Vec<u8>` as a base64 string
pub mod base64_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize bytes as base64
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::encode(bytes))
    }

    /// Deserialize base64 back to bytes
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        super::decode(&encoded).map_err(serde::de::Error::custom)
    }
}

//! Retrace Client - Outbound HTTP Adapter
//!
//! This crate wraps `reqwest::Client` with the Retrace interception protocol
//! so backend HTTP calls are recorded during capture and answered from
//! recorded snapshots during replay.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod error;

pub use client::RecordingHttpClient;
pub use error::{Error, Result};

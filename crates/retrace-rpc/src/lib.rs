//! Retrace RPC - Outbound RPC Adapter
//!
//! This crate intercepts unary and server-streaming client calls over any
//! transport implementing [`RpcTransport`]:
//! - Transport: the byte-level capability seam concrete RPC stacks implement
//! - Client: the mode-aware recording wrapper

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod transport;

pub use client::RecordingRpcClient;
pub use error::{Error, Result};
pub use transport::{ByteStream, RpcTransport};

#[cfg(test)]
mod tests;

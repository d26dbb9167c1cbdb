//! Transport - the RPC capability seam
//!
//! Concrete RPC stacks implement [`RpcTransport`] at the byte level (encoded
//! request in, encoded response(s) out), which keeps message codegen out of
//! this crate. A tonic channel, a JSON-RPC client, or a test double all fit
//! behind the same seam.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::error::Result;

/// Ordered stream of encoded response messages
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Byte-level RPC operations a concrete client must provide
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Issue a unary call and return the encoded response
    async fn unary(&self, service: &str, method: &str, request: Bytes) -> Result<Bytes>;

    /// Issue a server-streaming call and return the response stream
    async fn server_stream(&self, service: &str, method: &str, request: Bytes)
        -> Result<ByteStream>;

    /// Transport name (for logging and recorded metadata)
    fn name(&self) -> &str;
}

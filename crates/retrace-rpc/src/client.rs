//! Client - recording wrapper over an RPC transport
//!
//! Unary calls record the encoded response; server-streaming calls record
//! the full ordered message sequence. In both modes the caller receives a
//! materialized view of the recorded data, so capture and replay behave
//! identically downstream. Streams are drained before recording because the
//! record must be appended inside the request's context scope, not at some
//! later poll of a detached stream.

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use retrace_core::{
    codec, process_dependency_in, recording_enabled, DependencyKind, DependencyMeta, ErrorRecord,
    ExecutionContext, Interception, Mode, RecordedValue,
};

use crate::error::{Error, Result};
use crate::transport::{ByteStream, RpcTransport};

/// Tag under which unary responses are recorded
const UNARY_TAG: &str = "rpc_response";

/// Tag under which streaming message sequences are recorded
const STREAM_TAG: &str = "rpc_messages";

/// Recorded shape of one unary response
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UnaryRecord {
    #[serde(with = "codec::base64_bytes")]
    response: Vec<u8>,
}

/// Recorded shape of one server-streaming response sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StreamRecord {
    /// Base64-encoded messages, in delivery order
    messages: Vec<String>,
}

/// Mode-aware RPC client wrapping a real transport
#[derive(Debug, Clone)]
pub struct RecordingRpcClient<T> {
    transport: T,
    target: String,
}

impl<T: RpcTransport> RecordingRpcClient<T> {
    /// Wrap a transport
    #[must_use]
    pub fn new(transport: T) -> Self {
        let target = transport.name().to_string();
        Self { transport, target }
    }

    /// The wrapped transport, for calls that must bypass interception
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn meta(&self, service: &str, method: &str) -> DependencyMeta {
        DependencyMeta::new(
            self.target.clone(),
            DependencyKind::Rpc,
            format!("{service}/{method}"),
        )
    }

    /// Issue a unary call, recording or replaying per the current context
    #[instrument(skip(self, request), fields(target = %self.target))]
    pub async fn unary(&self, service: &str, method: &str, request: Bytes) -> Result<Bytes> {
        if !recording_enabled() {
            return self.transport.unary(service, method, request).await;
        }
        let ctx = ExecutionContext::current()?;
        let meta = self.meta(service, method);

        match ctx.mode() {
            Mode::Off => self.transport.unary(service, method, request).await,
            Mode::Capture => match self.transport.unary(service, method, request).await {
                Ok(response) => {
                    let record = UnaryRecord {
                        response: response.to_vec(),
                    };
                    process_dependency_in(
                        &ctx,
                        meta,
                        None,
                        vec![RecordedValue::of(UNARY_TAG, &record)?],
                    )?;
                    Ok(response)
                }
                Err(err) => {
                    process_dependency_in(&ctx, meta, Some(ErrorRecord::of(&err)), Vec::new())?;
                    Err(err)
                }
            },
            Mode::Replay => match process_dependency_in(&ctx, meta, None, Vec::new())? {
                Interception::Mocked {
                    error: Some(err), ..
                } => Err(Error::Replayed(err.message)),
                Interception::Mocked { results, .. } => {
                    let record: UnaryRecord = results
                        .first()
                        .ok_or_else(|| Error::InvalidRecord("unary record is empty".into()))?
                        .decode()?;
                    Ok(Bytes::from(record.response))
                }
                Interception::Passthrough { .. } => Err(Error::Core(
                    retrace_core::Error::InvalidMode("passthrough outcome during replay".into()),
                )),
            },
        }
    }

    /// Issue a server-streaming call, recording or replaying per the current
    /// context. The returned stream yields the recorded message sequence and
    /// reproduces a mid-stream failure as its final item.
    #[instrument(skip(self, request), fields(target = %self.target))]
    pub async fn server_stream(
        &self,
        service: &str,
        method: &str,
        request: Bytes,
    ) -> Result<ByteStream> {
        if !recording_enabled() {
            return self.transport.server_stream(service, method, request).await;
        }
        let ctx = ExecutionContext::current()?;
        let meta = self.meta(service, method);

        match ctx.mode() {
            Mode::Off => self.transport.server_stream(service, method, request).await,
            Mode::Capture => {
                let stream = match self.transport.server_stream(service, method, request).await {
                    Ok(stream) => stream,
                    Err(err) => {
                        let empty = StreamRecord {
                            messages: Vec::new(),
                        };
                        process_dependency_in(
                            &ctx,
                            meta,
                            Some(ErrorRecord::of(&err)),
                            vec![RecordedValue::of(STREAM_TAG, &empty)?],
                        )?;
                        return Err(err);
                    }
                };
                let (messages, failure) = drain(stream).await;
                let record = StreamRecord {
                    messages: messages.iter().map(|m| codec::encode(m)).collect(),
                };
                process_dependency_in(
                    &ctx,
                    meta,
                    failure.as_ref().map(|err| ErrorRecord::of(err)),
                    vec![RecordedValue::of(STREAM_TAG, &record)?],
                )?;
                debug!(
                    messages = messages.len(),
                    failed = failure.is_some(),
                    "recorded streaming call"
                );
                Ok(materialize(messages, failure))
            }
            Mode::Replay => match process_dependency_in(&ctx, meta, None, Vec::new())? {
                Interception::Mocked { error, results } => {
                    let record: StreamRecord = results
                        .first()
                        .ok_or_else(|| Error::InvalidRecord("stream record is empty".into()))?
                        .decode()?;
                    let mut messages = Vec::with_capacity(record.messages.len());
                    for encoded in &record.messages {
                        messages.push(Bytes::from(codec::decode(encoded)?));
                    }
                    // A failure with no delivered messages reads as a setup
                    // failure; anything else trails the replayed stream.
                    let failure = error.map(|err| Error::Replayed(err.message));
                    match (messages.is_empty(), failure) {
                        (true, Some(failure)) => Err(failure),
                        (_, failure) => Ok(materialize(messages, failure)),
                    }
                }
                Interception::Passthrough { .. } => Err(Error::Core(
                    retrace_core::Error::InvalidMode("passthrough outcome during replay".into()),
                )),
            },
        }
    }
}

/// Collect a live stream until end-of-stream or the first failure
async fn drain(mut stream: ByteStream) -> (Vec<Bytes>, Option<Error>) {
    let mut messages = Vec::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(message) => messages.push(message),
            Err(err) => return (messages, Some(err)),
        }
    }
    (messages, None)
}

/// Turn a recorded message sequence (and optional trailing failure) back
/// into a stream
fn materialize(messages: Vec<Bytes>, failure: Option<Error>) -> ByteStream {
    let items: Vec<Result<Bytes>> = messages
        .into_iter()
        .map(Ok)
        .chain(failure.map(Err))
        .collect();
    stream::iter(items).boxed()
}

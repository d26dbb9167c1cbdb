//! Client tests against a counting fake transport: capture records unary and
//! streaming outcomes, replay serves them without touching the transport.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};

use retrace_core::{set_recording_enabled, DependencyKind, ExecutionContext};

use crate::client::RecordingRpcClient;
use crate::error::{Error, Result};
use crate::transport::{ByteStream, RpcTransport};

static SWITCH: Mutex<()> = Mutex::new(());

fn switch_guard() -> MutexGuard<'static, ()> {
    SWITCH.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fake peer: unary echoes with a prefix, streaming yields three chunks.
#[derive(Debug, Default)]
struct FakeTransport {
    calls: AtomicUsize,
    fail_unary: bool,
}

impl FakeTransport {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RpcTransport for Arc<FakeTransport> {
    async fn unary(&self, _service: &str, _method: &str, request: Bytes) -> Result<Bytes> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_unary {
            return Err(Error::Transport("peer unavailable".into()));
        }
        let mut response = b"echo:".to_vec();
        response.extend_from_slice(&request);
        Ok(Bytes::from(response))
    }

    async fn server_stream(
        &self,
        _service: &str,
        _method: &str,
        _request: Bytes,
    ) -> Result<ByteStream> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let items: Vec<Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"one")),
            Ok(Bytes::from_static(b"two")),
            Ok(Bytes::from_static(b"three")),
        ];
        Ok(stream::iter(items).boxed())
    }

    fn name(&self) -> &str {
        "fake-peer"
    }
}

fn client(fail_unary: bool) -> (RecordingRpcClient<Arc<FakeTransport>>, Arc<FakeTransport>) {
    let transport = Arc::new(FakeTransport {
        calls: AtomicUsize::new(0),
        fail_unary,
    });
    (RecordingRpcClient::new(transport.clone()), transport)
}

#[tokio::test]
async fn test_capture_then_replay_unary() {
    let _guard = switch_guard();
    set_recording_enabled(true);
    let (client, transport) = client(false);

    let capture_ctx = ExecutionContext::capture();
    let response = capture_ctx
        .scope(client.unary("users.v1.Users", "Get", Bytes::from_static(b"id=7")))
        .await
        .unwrap();
    assert_eq!(&response[..], b"echo:id=7");
    assert_eq!(transport.calls(), 1);

    let records = capture_ctx.take_captured();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, DependencyKind::Rpc);
    assert_eq!(records[0].name, "fake-peer");
    assert_eq!(records[0].operation, "users.v1.Users/Get");

    let replay_ctx = ExecutionContext::replay("t-1", records);
    let replayed = replay_ctx
        .scope(client.unary("users.v1.Users", "Get", Bytes::from_static(b"id=7")))
        .await
        .unwrap();
    assert_eq!(replayed, response);
    assert_eq!(transport.calls(), 1, "replay must not touch the transport");
    set_recording_enabled(false);
}

#[tokio::test]
async fn test_capture_then_replay_server_stream() {
    let _guard = switch_guard();
    set_recording_enabled(true);
    let (client, transport) = client(false);

    let capture_ctx = ExecutionContext::capture();
    let captured: Vec<Bytes> = capture_ctx
        .scope(async {
            let stream = client
                .server_stream("metrics.v1.Metrics", "Watch", Bytes::new())
                .await
                .unwrap();
            stream.map(|item| item.unwrap()).collect().await
        })
        .await;
    assert_eq!(
        captured,
        vec![
            Bytes::from_static(b"one"),
            Bytes::from_static(b"two"),
            Bytes::from_static(b"three"),
        ]
    );

    let records = capture_ctx.take_captured();
    let replay_ctx = ExecutionContext::replay("t-1", records);
    let replayed: Vec<Bytes> = replay_ctx
        .scope(async {
            let stream = client
                .server_stream("metrics.v1.Metrics", "Watch", Bytes::new())
                .await
                .unwrap();
            stream.map(|item| item.unwrap()).collect().await
        })
        .await;
    assert_eq!(replayed, captured);
    assert_eq!(transport.calls(), 1, "replay must not touch the transport");
    set_recording_enabled(false);
}

#[tokio::test]
async fn test_unary_failure_is_recorded_and_reproduced() {
    let _guard = switch_guard();
    set_recording_enabled(true);
    let (client, _transport) = client(true);

    let capture_ctx = ExecutionContext::capture();
    let err = capture_ctx
        .scope(client.unary("users.v1.Users", "Get", Bytes::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(_)));

    let records = capture_ctx.take_captured();
    assert!(records[0].error.is_some());

    let replay_ctx = ExecutionContext::replay("t-1", records);
    let err = replay_ctx
        .scope(client.unary("users.v1.Users", "Get", Bytes::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Replayed(ref msg) if msg.contains("peer unavailable")));
    set_recording_enabled(false);
}

#[tokio::test]
async fn test_replay_exhaustion_surfaces_engine_error() {
    let _guard = switch_guard();
    set_recording_enabled(true);
    let (client, _transport) = client(false);
    let ctx = ExecutionContext::replay("t-1", Vec::new());

    let err = ctx
        .scope(client.unary("users.v1.Users", "Get", Bytes::new()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Core(retrace_core::Error::ReplayExhausted { .. })
    ));
    set_recording_enabled(false);
}

#[tokio::test]
async fn test_missing_context_is_reported() {
    let _guard = switch_guard();
    set_recording_enabled(true);
    let (client, _transport) = client(false);

    let err = client
        .unary("users.v1.Users", "Get", Bytes::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Core(retrace_core::Error::ContextMissing)
    ));
    set_recording_enabled(false);
}

//! Retrace - record and replay a service's requests and dependency calls
//!
//! A service instrumented with Retrace transparently records every inbound
//! HTTP request together with every outbound call it makes (SQL, document
//! store, RPC, HTTP backends). A recorded request can later be replayed with
//! the recorded dependency outputs substituted for the real calls, verifying
//! functional behavior deterministically without live dependencies.
//!
//! The engine lives in `retrace-core`; one crate per protocol family adapts
//! it:
//! - `retrace-http`: inbound axum/tower middleware ([`RecordLayer`])
//! - `retrace-sql`: sqlx Postgres executor ([`RecordingPool`])
//! - `retrace-docstore`: collection-level CRUD ([`RecordingCollection`])
//! - `retrace-rpc`: unary/streaming RPC client ([`RecordingRpcClient`])
//! - `retrace-client`: reqwest wrapper ([`RecordingHttpClient`])
//!
//! ```no_run
//! use std::sync::Arc;
//! use axum::{routing::get, Router};
//! use retrace::{RecordLayer, Recorder, RecorderConfig};
//!
//! # async fn demo() {
//! retrace::init_recording_from_env();
//! let (recorder, _store) = Recorder::in_memory(RecorderConfig::new("demo"));
//! let app: Router = Router::new()
//!     .route("/ping", get(|| async { "pong" }))
//!     .layer(RecordLayer::new(Arc::new(recorder)));
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub use retrace_core::{
    codec, init_recording_from_env, process_dependency, process_dependency_in, recording_enabled,
    set_recording_enabled, CaptureSink, DependencyKind, DependencyMeta, DependencyRecord, Error,
    ErrorRecord, ExecutionContext, HttpRequestSnapshot, HttpResponseSnapshot, InMemoryStore,
    Interception, Mode, RecordedValue, Recorder, RecorderConfig, ReplayStore, Result, TestCase,
    RECORDING_ENV,
};

// Adapter crates as modules, for their error types and supporting items.
pub use retrace_client as client;
pub use retrace_docstore as docstore;
pub use retrace_http as http;
pub use retrace_rpc as rpc;
pub use retrace_sql as sql;

pub use retrace_client::RecordingHttpClient;
pub use retrace_docstore::{
    DocumentBackend, DocumentCursor, InMemoryBackend, RecordingCollection,
};
pub use retrace_http::{RecordLayer, TeeBody};
pub use retrace_rpc::{RecordingRpcClient, RpcTransport};
pub use retrace_sql::{RecordingPool, SqlParam};

//! Retrace Core - Dependency Interception & Deterministic Replay Engine
//!
//! This crate provides the engine every Retrace adapter plugs into:
//! - Context: per-request execution state with task-local propagation
//! - Intercept: the generic dependency capture/replay protocol
//! - Recorder: the request-capture lifecycle facade
//! - Record/Snapshot: dependency records, request/response snapshots, test cases
//! - Store: collaborator seams for persistence and comparison

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod intercept;
pub mod mode;
pub mod record;
pub mod recorder;
pub mod snapshot;
pub mod store;

pub use config::RecorderConfig;
pub use context::ExecutionContext;
pub use error::{Error, Result};
pub use intercept::{process_dependency, process_dependency_in, Interception};
pub use mode::{
    init_recording_from_env, recording_enabled, set_recording_enabled, Mode, RECORDING_ENV,
};
pub use record::{DependencyKind, DependencyMeta, DependencyRecord, ErrorRecord, RecordedValue};
pub use recorder::Recorder;
pub use snapshot::{HttpRequestSnapshot, HttpResponseSnapshot, TestCase};
pub use store::{CaptureSink, InMemoryStore, ReplayStore};

//! Recorder - the per-service facade over the capture lifecycle
//!
//! One `Recorder` is built at startup and shared by every inbound adapter. It
//! owns the collaborator handles and implements the mode decision, the replay
//! dependency lookup, and the end-of-request completion paths. Adapters do
//! the transport-specific work (marker detection, body buffering, response
//! teeing) and delegate the rest here.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::config::RecorderConfig;
use crate::context::ExecutionContext;
use crate::error::Result;
use crate::mode::recording_enabled;
use crate::snapshot::{HttpRequestSnapshot, HttpResponseSnapshot, TestCase};
use crate::store::{CaptureSink, InMemoryStore, ReplayStore};

/// Capture/replay facade shared across a service's adapters
#[derive(Clone)]
pub struct Recorder {
    config: RecorderConfig,
    store: Arc<dyn ReplayStore>,
    sink: Arc<dyn CaptureSink>,
}

impl Recorder {
    /// Create a recorder with explicit collaborators
    #[must_use]
    pub fn new(config: RecorderConfig, store: Arc<dyn ReplayStore>, sink: Arc<dyn CaptureSink>) -> Self {
        Self {
            config,
            store,
            sink,
        }
    }

    /// Create a recorder backed by a fresh [`InMemoryStore`] (tests, demos).
    ///
    /// Returns the store handle so callers can seed dependencies and inspect
    /// emitted cases.
    #[must_use]
    pub fn in_memory(config: RecorderConfig) -> (Self, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let recorder = Self::new(config, store.clone(), store.clone());
        (recorder, store)
    }

    /// The recorder settings
    #[must_use]
    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// The header carrying the replay marker
    #[must_use]
    pub fn replay_header(&self) -> &str {
        &self.config.replay_header
    }

    /// Decide the mode for an inbound request and build its context.
    ///
    /// `marker` is the replay test identifier if the request carried one.
    /// Process-wide recording off wins over everything; a marker means replay
    /// (with the store lookup for its recorded dependencies); no marker means
    /// capture.
    #[instrument(skip(self), fields(app = %self.config.app))]
    pub async fn begin_request(&self, marker: Option<&str>) -> Result<Arc<ExecutionContext>> {
        if !recording_enabled() {
            return Ok(ExecutionContext::passthrough());
        }
        match marker {
            Some(test_id) => {
                let records = self.store.dependencies(test_id).await?;
                debug!(
                    test_id,
                    records = records.len(),
                    store = self.store.name(),
                    "replaying recorded request"
                );
                Ok(ExecutionContext::replay(test_id, records))
            }
            None => Ok(ExecutionContext::capture()),
        }
    }

    /// Complete a capture cycle: assemble the test case and emit it.
    #[instrument(skip_all, fields(app = %self.config.app, uri = %request.uri))]
    pub async fn finish_capture(
        &self,
        ctx: &ExecutionContext,
        request: HttpRequestSnapshot,
        response: HttpResponseSnapshot,
    ) -> Result<()> {
        let dependencies = ctx.take_captured();
        let case = TestCase::new(self.config.app.clone(), request, response, dependencies);
        debug!(
            case_id = %case.id,
            dependencies = case.dependencies.len(),
            sink = self.sink.name(),
            "captured test case"
        );
        self.sink.emit(case).await
    }

    /// Complete a replay cycle: hand the response to the comparison side.
    #[instrument(skip(self, response))]
    pub async fn finish_replay(&self, test_id: &str, response: HttpResponseSnapshot) -> Result<()> {
        debug!(test_id, status = response.status, "replay completed");
        self.store.report_replay(test_id, response).await
    }
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("config", &self.config)
            .field("store", &self.store.name())
            .field("sink", &self.sink.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::mode::{set_recording_enabled, Mode};
    use crate::record::{DependencyKind, DependencyMeta, DependencyRecord};
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    // The recording switch is process-wide; tests that flip it serialize here.
    static SWITCH: Mutex<()> = Mutex::new(());

    fn request() -> HttpRequestSnapshot {
        HttpRequestSnapshot {
            method: "GET".into(),
            uri: "/ping".into(),
            headers: Vec::new(),
            body: Vec::new(),
            path_params: BTreeMap::new(),
        }
    }

    fn response() -> HttpResponseSnapshot {
        HttpResponseSnapshot {
            status: 200,
            headers: Vec::new(),
            body: b"pong".to_vec(),
        }
    }

    #[tokio::test]
    async fn test_mode_partition() {
        let _guard = SWITCH.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let (recorder, store) = Recorder::in_memory(RecorderConfig::new("demo"));
        store.insert_dependencies("t-1", Vec::new());

        set_recording_enabled(false);
        let ctx = recorder.begin_request(Some("t-1")).await.unwrap();
        assert_eq!(ctx.mode(), Mode::Off);

        set_recording_enabled(true);
        let ctx = recorder.begin_request(None).await.unwrap();
        assert_eq!(ctx.mode(), Mode::Capture);

        let ctx = recorder.begin_request(Some("t-1")).await.unwrap();
        assert_eq!(ctx.mode(), Mode::Replay);
        assert_eq!(ctx.test_id(), Some("t-1"));

        set_recording_enabled(false);
    }

    #[tokio::test]
    async fn test_begin_request_surfaces_unknown_test_id() {
        let _guard = SWITCH.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        set_recording_enabled(true);
        let (recorder, _store) = Recorder::in_memory(RecorderConfig::new("demo"));

        let err = recorder.begin_request(Some("t-missing")).await.unwrap_err();
        assert!(matches!(err, Error::UnknownTestCase(_)));
        set_recording_enabled(false);
    }

    #[tokio::test]
    async fn test_finish_capture_emits_case_with_dependencies() {
        let (recorder, store) = Recorder::in_memory(RecorderConfig::new("demo"));
        let ctx = ExecutionContext::capture();
        ctx.push_record(DependencyRecord::new(
            DependencyMeta::new("db", DependencyKind::Sql, "Ping"),
            None,
            Vec::new(),
        ));

        recorder
            .finish_capture(&ctx, request(), response())
            .await
            .unwrap();

        let cases = store.cases();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].app, "demo");
        assert_eq!(cases[0].dependencies.len(), 1);
        assert_eq!(cases[0].dependencies[0].operation, "Ping");
        // Buffer drained; a second finish would emit an empty sequence.
        assert_eq!(ctx.captured_len(), 0);
    }

    #[tokio::test]
    async fn test_finish_replay_reports_response() {
        let (recorder, store) = Recorder::in_memory(RecorderConfig::new("demo"));
        recorder.finish_replay("t-1", response()).await.unwrap();
        assert_eq!(store.replayed("t-1").unwrap().status, 200);
    }
}

//! Context - per-request execution state and task-local propagation
//!
//! An [`ExecutionContext`] is created once per inbound request and carries the
//! request's mode, test identifier, and dependency-record buffer through the
//! whole downstream call tree via a tokio task-local scope. Constructors
//! enforce the invariant that a test identifier is present iff the mode is
//! replay.
//!
//! The context is never shared between concurrent requests. Dependency calls
//! within one request are expected to be sequential; the internal buffer is
//! mutex-guarded so a violation of that contract yields mismatched records or
//! replay exhaustion, never memory unsafety.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Error, Result};
use crate::mode::Mode;
use crate::record::DependencyRecord;

tokio::task_local! {
    static CURRENT: Arc<ExecutionContext>;
}

#[derive(Debug, Default)]
struct BufferState {
    /// Records appended during capture, in call order
    captured: Vec<DependencyRecord>,
    /// Records remaining to be consumed during replay, in call order
    pending: VecDeque<DependencyRecord>,
    /// Number of replay records consumed so far
    consumed: usize,
}

/// Per-request execution state
#[derive(Debug)]
pub struct ExecutionContext {
    mode: Mode,
    test_id: Option<String>,
    buffer: Mutex<BufferState>,
}

impl ExecutionContext {
    /// Create a capture-mode context with an empty record buffer
    #[must_use]
    pub fn capture() -> Arc<Self> {
        Arc::new(Self {
            mode: Mode::Capture,
            test_id: None,
            buffer: Mutex::new(BufferState::default()),
        })
    }

    /// Create a replay-mode context seeded with previously recorded dependencies
    #[must_use]
    pub fn replay(test_id: impl Into<String>, records: Vec<DependencyRecord>) -> Arc<Self> {
        Arc::new(Self {
            mode: Mode::Replay,
            test_id: Some(test_id.into()),
            buffer: Mutex::new(BufferState {
                pending: records.into(),
                ..BufferState::default()
            }),
        })
    }

    /// Create a pass-through context that performs no interception
    #[must_use]
    pub fn passthrough() -> Arc<Self> {
        Arc::new(Self {
            mode: Mode::Off,
            test_id: None,
            buffer: Mutex::new(BufferState::default()),
        })
    }

    /// The mode this request runs in
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The test identifier (present iff the mode is replay)
    #[must_use]
    pub fn test_id(&self) -> Option<&str> {
        self.test_id.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, BufferState> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a record captured for this request
    pub(crate) fn push_record(&self, record: DependencyRecord) {
        self.lock().captured.push(record);
    }

    /// Consume the next replay record positionally.
    ///
    /// `operation` names the live call for the exhaustion diagnostic.
    pub(crate) fn next_record(&self, operation: &str) -> Result<DependencyRecord> {
        let mut state = self.lock();
        match state.pending.pop_front() {
            Some(record) => {
                state.consumed += 1;
                Ok(record)
            }
            None => Err(Error::ReplayExhausted {
                operation: operation.to_string(),
                consumed: state.consumed,
            }),
        }
    }

    /// Number of records captured so far
    #[must_use]
    pub fn captured_len(&self) -> usize {
        self.lock().captured.len()
    }

    /// Drain the captured record buffer (end of a capture cycle)
    #[must_use]
    pub fn take_captured(&self) -> Vec<DependencyRecord> {
        std::mem::take(&mut self.lock().captured)
    }

    /// Run a future with this context established for its whole call tree.
    ///
    /// Every call to [`ExecutionContext::current`] made while the future (and
    /// anything it awaits on the same task) runs will resolve to this context.
    /// Work handed to `tokio::spawn` leaves the scope; adapters must keep
    /// dependency calls on the request's task.
    pub async fn scope<F>(self: &Arc<Self>, fut: F) -> F::Output
    where
        F: Future,
    {
        CURRENT.scope(Arc::clone(self), fut).await
    }

    /// Retrieve the context established for the current task.
    ///
    /// Returns [`Error::ContextMissing`] when no capture lifecycle is active,
    /// deliberately distinct from a context whose mode is off.
    pub fn current() -> Result<Arc<Self>> {
        CURRENT
            .try_with(Arc::clone)
            .map_err(|_| Error::ContextMissing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{DependencyKind, DependencyMeta};

    fn record(operation: &str) -> DependencyRecord {
        DependencyRecord::new(
            DependencyMeta::new("db", DependencyKind::Sql, operation),
            None,
            Vec::new(),
        )
    }

    #[test]
    fn test_constructors_enforce_test_id_invariant() {
        assert_eq!(ExecutionContext::capture().test_id(), None);
        assert_eq!(ExecutionContext::passthrough().test_id(), None);
        let ctx = ExecutionContext::replay("t-1", Vec::new());
        assert_eq!(ctx.test_id(), Some("t-1"));
        assert_eq!(ctx.mode(), Mode::Replay);
    }

    #[test]
    fn test_replay_records_consumed_in_order() {
        let ctx = ExecutionContext::replay("t-1", vec![record("First"), record("Second")]);
        assert_eq!(ctx.next_record("First").unwrap().operation, "First");
        assert_eq!(ctx.next_record("Second").unwrap().operation, "Second");
    }

    #[test]
    fn test_exhaustion_reports_consumed_count() {
        let ctx = ExecutionContext::replay("t-1", vec![record("Only")]);
        ctx.next_record("Only").unwrap();
        let err = ctx.next_record("Extra").unwrap_err();
        match err {
            Error::ReplayExhausted {
                operation,
                consumed,
            } => {
                assert_eq!(operation, "Extra");
                assert_eq!(consumed, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_current_inside_and_outside_scope() {
        assert!(matches!(
            ExecutionContext::current(),
            Err(Error::ContextMissing)
        ));

        let ctx = ExecutionContext::capture();
        let seen = ctx
            .scope(async {
                let current = ExecutionContext::current().unwrap();
                current.mode()
            })
            .await;
        assert_eq!(seen, Mode::Capture);

        assert!(matches!(
            ExecutionContext::current(),
            Err(Error::ContextMissing)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_isolated() {
        let a = ExecutionContext::capture();
        let b = ExecutionContext::replay("t-b", vec![record("Ping")]);

        let (mode_a, mode_b) = tokio::join!(
            a.scope(async { ExecutionContext::current().unwrap().mode() }),
            b.scope(async { ExecutionContext::current().unwrap().mode() }),
        );
        assert_eq!(mode_a, Mode::Capture);
        assert_eq!(mode_b, Mode::Replay);
    }

    #[test]
    fn test_take_captured_drains_buffer() {
        let ctx = ExecutionContext::capture();
        ctx.push_record(record("One"));
        ctx.push_record(record("Two"));
        assert_eq!(ctx.captured_len(), 2);

        let records = ctx.take_captured();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].operation, "One");
        assert_eq!(ctx.captured_len(), 0);
    }
}

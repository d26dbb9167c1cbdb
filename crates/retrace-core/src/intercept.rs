//! Intercept - the generic dependency interception protocol
//!
//! Every outbound adapter funnels its calls through [`process_dependency`]
//! with a single call site for all modes: in capture the real call has
//! already executed and its outcome is recorded; in replay the real call must
//! not execute and the outcome comes from the next recorded dependency, in
//! positional order.

use tracing::warn;

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::mode::Mode;
use crate::record::{DependencyMeta, DependencyRecord, ErrorRecord, RecordedValue};

/// Outcome of routing a dependency call through the protocol
#[derive(Debug)]
pub enum Interception {
    /// The real call's outcome stands (capture or off); results are the
    /// caller's own values, returned unchanged
    Passthrough {
        /// The caller-supplied results
        results: Vec<RecordedValue>,
    },
    /// The call was answered from recorded data; the real call must not run
    Mocked {
        /// Recorded failure to reproduce, if any
        error: Option<ErrorRecord>,
        /// Recorded result values
        results: Vec<RecordedValue>,
    },
}

impl Interception {
    /// Whether the call was answered from recorded data
    #[must_use]
    pub fn was_mocked(&self) -> bool {
        matches!(self, Self::Mocked { .. })
    }

    /// The result values, regardless of origin
    #[must_use]
    pub fn into_results(self) -> Vec<RecordedValue> {
        match self {
            Self::Passthrough { results } | Self::Mocked { results, .. } => results,
        }
    }
}

/// Route a dependency call through the context established for this task.
///
/// Fails with a context-missing error when no capture lifecycle is active;
/// adapters gate on the process-wide recording switch before calling this.
pub fn process_dependency(
    meta: DependencyMeta,
    error: Option<ErrorRecord>,
    results: Vec<RecordedValue>,
) -> Result<Interception> {
    let ctx = ExecutionContext::current()?;
    process_dependency_in(&ctx, meta, error, results)
}

/// Route a dependency call through an explicit context.
pub fn process_dependency_in(
    ctx: &ExecutionContext,
    meta: DependencyMeta,
    error: Option<ErrorRecord>,
    results: Vec<RecordedValue>,
) -> Result<Interception> {
    match ctx.mode() {
        Mode::Off => Ok(Interception::Passthrough { results }),
        Mode::Capture => {
            ctx.push_record(DependencyRecord::new(meta, error, results.clone()));
            Ok(Interception::Passthrough { results })
        }
        Mode::Replay => {
            let record = ctx.next_record(&meta.operation)?;
            if !record.matches(&meta) {
                // Positional matching still stands; the mismatch is drift
                // diagnostics for whoever reads the logs.
                warn!(
                    expected = %record.meta(),
                    actual = %meta,
                    test_id = ctx.test_id().unwrap_or(""),
                    "replayed dependency does not match recorded call"
                );
            }
            Ok(Interception::Mocked {
                error: record.error,
                results: record.results,
            })
        }
    }
}

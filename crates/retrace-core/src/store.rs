//! Store - external collaborator seams and the in-memory implementation
//!
//! The engine does not persist test cases or judge replay results; it hands
//! data to collaborators behind these traits. [`InMemoryStore`] implements
//! both sides in-process for tests and demos.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::record::DependencyRecord;
use crate::snapshot::{HttpResponseSnapshot, TestCase};

/// Replay-side collaborator: dependency lookup and response delivery
#[async_trait]
pub trait ReplayStore: Send + Sync {
    /// The ordered dependency records captured originally for this test id
    async fn dependencies(&self, test_id: &str) -> Result<Vec<DependencyRecord>>;

    /// Deliver a replayed response for comparison, keyed by test id.
    ///
    /// The engine does not decide pass/fail; it only delivers the snapshot.
    async fn report_replay(&self, test_id: &str, response: HttpResponseSnapshot) -> Result<()>;

    /// Store name (for logging)
    fn name(&self) -> &str;
}

/// Capture-side collaborator: test case persistence
#[async_trait]
pub trait CaptureSink: Send + Sync {
    /// Persist a captured test case
    async fn emit(&self, case: TestCase) -> Result<()>;

    /// Sink name (for logging)
    fn name(&self) -> &str;
}

/// In-process store implementing both collaborator seams
#[derive(Debug, Default)]
pub struct InMemoryStore {
    dependencies: Mutex<HashMap<String, Vec<DependencyRecord>>>,
    replayed: Mutex<HashMap<String, HttpResponseSnapshot>>,
    cases: Mutex<Vec<TestCase>>,
}

fn relock<'a, T>(
    result: std::result::Result<MutexGuard<'a, T>, PoisonError<MutexGuard<'a, T>>>,
) -> MutexGuard<'a, T> {
    result.unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the dependency sequence to replay for a test id
    pub fn insert_dependencies(&self, test_id: impl Into<String>, records: Vec<DependencyRecord>) {
        relock(self.dependencies.lock()).insert(test_id.into(), records);
    }

    /// Register a captured case's dependencies for replay under a test id
    pub fn seed_from_case(&self, test_id: impl Into<String>, case: &TestCase) {
        self.insert_dependencies(test_id, case.dependencies.clone());
    }

    /// Test cases emitted so far
    #[must_use]
    pub fn cases(&self) -> Vec<TestCase> {
        relock(self.cases.lock()).clone()
    }

    /// The response last reported for a replayed test id
    #[must_use]
    pub fn replayed(&self, test_id: &str) -> Option<HttpResponseSnapshot> {
        relock(self.replayed.lock()).get(test_id).cloned()
    }
}

#[async_trait]
impl ReplayStore for InMemoryStore {
    async fn dependencies(&self, test_id: &str) -> Result<Vec<DependencyRecord>> {
        relock(self.dependencies.lock())
            .get(test_id)
            .cloned()
            .ok_or_else(|| Error::UnknownTestCase(test_id.to_string()))
    }

    async fn report_replay(&self, test_id: &str, response: HttpResponseSnapshot) -> Result<()> {
        relock(self.replayed.lock()).insert(test_id.to_string(), response);
        Ok(())
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

#[async_trait]
impl CaptureSink for InMemoryStore {
    async fn emit(&self, case: TestCase) -> Result<()> {
        relock(self.cases.lock()).push(case);
        Ok(())
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

//! Collection - recording wrapper over a document backend
//!
//! `RecordingCollection` mirrors the operation set of a collection handle and
//! funnels every call through the interception protocol. The dependency call
//! is the collection operation; cursor traversal over a `find` result is pure
//! in-memory iteration, so positional replay matching stays unambiguous.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::instrument;

use retrace_core::{
    process_dependency_in, recording_enabled, DependencyKind, DependencyMeta, ErrorRecord,
    ExecutionContext, Interception, Mode, RecordedValue,
};

use crate::backend::{
    DeleteOutcome, Document, DocumentBackend, InsertManyOutcome, InsertOneOutcome, UpdateOutcome,
};
use crate::error::{Error, Result};

/// Cursor over the documents a `find` produced.
///
/// Both modes hand the caller the same materialized view: the recorded
/// document set, iterated in order.
#[derive(Debug)]
pub struct DocumentCursor {
    docs: VecDeque<Document>,
}

impl DocumentCursor {
    fn new(docs: Vec<Document>) -> Self {
        Self { docs: docs.into() }
    }

    /// Advance to the next document
    pub fn next(&mut self) -> Option<Document> {
        self.docs.pop_front()
    }

    /// Advance, with the fallible signature streaming cursors present
    pub fn try_next(&mut self) -> Result<Option<Document>> {
        Ok(self.docs.pop_front())
    }

    /// Remaining documents, consuming the cursor
    #[must_use]
    pub fn all(self) -> Vec<Document> {
        self.docs.into()
    }

    /// Documents not yet consumed
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.docs.len()
    }

    /// Release the cursor
    pub fn close(self) {}
}

/// Mode-aware collection handle wrapping a real document backend
#[derive(Debug)]
pub struct RecordingCollection<B> {
    backend: Arc<B>,
    name: String,
}

impl<B> Clone for RecordingCollection<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            name: self.name.clone(),
        }
    }
}

impl<B: DocumentBackend> RecordingCollection<B> {
    /// Wrap a backend as a handle on the named collection
    #[must_use]
    pub fn new(backend: Arc<B>, name: impl Into<String>) -> Self {
        Self {
            backend,
            name: name.into(),
        }
    }

    /// The collection name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The wrapped backend, for operations that must bypass interception
    #[must_use]
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    fn meta(&self, operation: &str) -> DependencyMeta {
        DependencyMeta::new(self.name.clone(), DependencyKind::DocumentDb, operation)
    }

    /// Insert one document
    #[instrument(skip(self, doc), fields(collection = %self.name))]
    pub async fn insert_one(&self, doc: Document) -> Result<InsertOneOutcome> {
        self.intercept(
            "InsertOne",
            "inserted",
            self.backend.insert_one(&self.name, doc),
        )
        .await
    }

    /// Insert several documents
    #[instrument(skip(self, docs), fields(collection = %self.name))]
    pub async fn insert_many(&self, docs: Vec<Document>) -> Result<InsertManyOutcome> {
        self.intercept(
            "InsertMany",
            "inserted_many",
            self.backend.insert_many(&self.name, docs),
        )
        .await
    }

    /// Find the first document matching the filter
    #[instrument(skip(self, filter), fields(collection = %self.name))]
    pub async fn find_one(&self, filter: Document) -> Result<Option<Document>> {
        self.intercept(
            "FindOne",
            "maybe_doc",
            self.backend.find_one(&self.name, filter),
        )
        .await
    }

    /// Find every document matching the filter
    #[instrument(skip(self, filter), fields(collection = %self.name))]
    pub async fn find(&self, filter: Document) -> Result<DocumentCursor> {
        let docs = self
            .intercept("Find", "docs", self.backend.find(&self.name, filter))
            .await?;
        Ok(DocumentCursor::new(docs))
    }

    /// Update the first document matching the filter
    #[instrument(skip(self, filter, update), fields(collection = %self.name))]
    pub async fn update_one(&self, filter: Document, update: Document) -> Result<UpdateOutcome> {
        self.intercept(
            "UpdateOne",
            "update",
            self.backend.update_one(&self.name, filter, update),
        )
        .await
    }

    /// Update every document matching the filter
    #[instrument(skip(self, filter, update), fields(collection = %self.name))]
    pub async fn update_many(&self, filter: Document, update: Document) -> Result<UpdateOutcome> {
        self.intercept(
            "UpdateMany",
            "update",
            self.backend.update_many(&self.name, filter, update),
        )
        .await
    }

    /// Delete the first document matching the filter
    #[instrument(skip(self, filter), fields(collection = %self.name))]
    pub async fn delete_one(&self, filter: Document) -> Result<DeleteOutcome> {
        self.intercept(
            "DeleteOne",
            "delete",
            self.backend.delete_one(&self.name, filter),
        )
        .await
    }

    /// Delete every document matching the filter
    #[instrument(skip(self, filter), fields(collection = %self.name))]
    pub async fn delete_many(&self, filter: Document) -> Result<DeleteOutcome> {
        self.intercept(
            "DeleteMany",
            "delete",
            self.backend.delete_many(&self.name, filter),
        )
        .await
    }

    /// Route one operation through the interception protocol.
    ///
    /// `call` is only awaited in capture and off modes; replay drops it
    /// unpolled, so the real backend is never touched.
    async fn intercept<T, F>(&self, operation: &str, tag: &str, call: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: Future<Output = Result<T>>,
    {
        if !recording_enabled() {
            return call.await;
        }
        let ctx = ExecutionContext::current()?;
        match ctx.mode() {
            Mode::Off => call.await,
            Mode::Capture => match call.await {
                Ok(value) => {
                    process_dependency_in(
                        &ctx,
                        self.meta(operation),
                        None,
                        vec![RecordedValue::of(tag, &value)?],
                    )?;
                    Ok(value)
                }
                Err(err) => {
                    process_dependency_in(
                        &ctx,
                        self.meta(operation),
                        Some(ErrorRecord::of(&err)),
                        Vec::new(),
                    )?;
                    Err(err)
                }
            },
            Mode::Replay => match process_dependency_in(
                &ctx,
                self.meta(operation),
                None,
                Vec::new(),
            )? {
                Interception::Mocked {
                    error: Some(err), ..
                } => Err(Error::Replayed(err.message)),
                Interception::Mocked { results, .. } => results
                    .first()
                    .ok_or_else(|| Error::InvalidRecord(format!("{operation} record is empty")))?
                    .decode()
                    .map_err(Error::from),
                Interception::Passthrough { .. } => Err(Error::Core(
                    retrace_core::Error::InvalidMode("passthrough outcome during replay".into()),
                )),
            },
        }
    }
}

//! Backend - the document-store capability seam
//!
//! Any concrete document client (a driver connection, a REST facade, a test
//! double) implements [`DocumentBackend`] over JSON documents. The recording
//! collection wraps a backend and adds mode-aware interception on top.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A document, as stored and filtered
pub type Document = serde_json::Value;

/// Outcome of a single-document insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertOneOutcome {
    /// Identifier assigned to the inserted document
    pub inserted_id: String,
}

/// Outcome of a multi-document insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertManyOutcome {
    /// Identifiers assigned to the inserted documents, in input order
    pub inserted_ids: Vec<String>,
}

/// Outcome of an update operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    /// Documents matching the filter
    pub matched: u64,
    /// Documents actually modified
    pub modified: u64,
}

/// Outcome of a delete operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    /// Documents removed
    pub deleted: u64,
}

/// Collection-level operations a concrete document client must provide
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Insert one document
    async fn insert_one(&self, collection: &str, doc: Document) -> Result<InsertOneOutcome>;

    /// Insert several documents
    async fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<InsertManyOutcome>;

    /// Find the first document matching the filter
    async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>>;

    /// Find every document matching the filter
    async fn find(&self, collection: &str, filter: Document) -> Result<Vec<Document>>;

    /// Update the first document matching the filter
    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<UpdateOutcome>;

    /// Update every document matching the filter
    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<UpdateOutcome>;

    /// Delete the first document matching the filter
    async fn delete_one(&self, collection: &str, filter: Document) -> Result<DeleteOutcome>;

    /// Delete every document matching the filter
    async fn delete_many(&self, collection: &str, filter: Document) -> Result<DeleteOutcome>;

    /// Backend name (for logging and recorded metadata)
    fn name(&self) -> &str;
}

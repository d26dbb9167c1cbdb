//! Memory - in-process document backend
//!
//! A small JSON document store used by tests and demos. Filters are shallow
//! subset matches; updates understand `$set` and otherwise replace the
//! matched document. The call counter lets tests assert that replay never
//! reaches the backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use crate::backend::{
    DeleteOutcome, Document, DocumentBackend, InsertManyOutcome, InsertOneOutcome, UpdateOutcome,
};
use crate::error::{Error, Result};

/// In-process document backend
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    collections: Mutex<HashMap<String, Vec<Document>>>,
    calls: AtomicUsize,
    next_id: AtomicU64,
}

impl InMemoryBackend {
    /// Create an empty backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of real operations served (replay must leave this unchanged)
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Document>>> {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    fn assign_id(&self, doc: &mut Document) -> Result<String> {
        let map = doc
            .as_object_mut()
            .ok_or_else(|| Error::Backend("document must be a JSON object".into()))?;
        if let Some(id) = map.get("_id") {
            return Ok(id.as_str().map_or_else(|| id.to_string(), str::to_string));
        }
        let id = format!("doc-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        map.insert("_id".to_string(), Value::String(id.clone()));
        Ok(id)
    }
}

/// Shallow subset match: every filter field must equal the document's field.
/// An empty or non-object filter matches everything.
fn matches(filter: &Document, doc: &Document) -> bool {
    match filter.as_object() {
        Some(fields) if !fields.is_empty() => fields
            .iter()
            .all(|(key, expected)| doc.get(key) == Some(expected)),
        _ => true,
    }
}

/// Apply an update document: `$set` merges fields, anything else replaces
/// the document (keeping its `_id`). Returns whether the document changed.
fn apply_update(doc: &mut Document, update: &Document) -> bool {
    if let Some(set) = update.get("$set").and_then(Value::as_object) {
        let Some(target) = doc.as_object_mut() else {
            return false;
        };
        let mut changed = false;
        for (key, value) in set {
            if target.get(key) != Some(value) {
                target.insert(key.clone(), value.clone());
                changed = true;
            }
        }
        changed
    } else {
        let id = doc.get("_id").cloned();
        let mut replacement = update.clone();
        if let (Some(id), Some(map)) = (id, replacement.as_object_mut()) {
            map.entry("_id".to_string()).or_insert(id);
        }
        let changed = *doc != replacement;
        *doc = replacement;
        changed
    }
}

#[async_trait]
impl DocumentBackend for InMemoryBackend {
    async fn insert_one(&self, collection: &str, mut doc: Document) -> Result<InsertOneOutcome> {
        self.touch();
        let inserted_id = self.assign_id(&mut doc)?;
        self.lock().entry(collection.to_string()).or_default().push(doc);
        Ok(InsertOneOutcome { inserted_id })
    }

    async fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<InsertManyOutcome> {
        self.touch();
        let mut inserted_ids = Vec::with_capacity(docs.len());
        let mut prepared = Vec::with_capacity(docs.len());
        for mut doc in docs {
            inserted_ids.push(self.assign_id(&mut doc)?);
            prepared.push(doc);
        }
        self.lock()
            .entry(collection.to_string())
            .or_default()
            .extend(prepared);
        Ok(InsertManyOutcome { inserted_ids })
    }

    async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>> {
        self.touch();
        Ok(self
            .lock()
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| matches(&filter, doc)).cloned()))
    }

    async fn find(&self, collection: &str, filter: Document) -> Result<Vec<Document>> {
        self.touch();
        Ok(self
            .lock()
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| matches(&filter, doc))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<UpdateOutcome> {
        self.touch();
        let mut store = self.lock();
        let docs = store.entry(collection.to_string()).or_default();
        for doc in docs.iter_mut() {
            if matches(&filter, doc) {
                let modified = u64::from(apply_update(doc, &update));
                return Ok(UpdateOutcome {
                    matched: 1,
                    modified,
                });
            }
        }
        Ok(UpdateOutcome {
            matched: 0,
            modified: 0,
        })
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<UpdateOutcome> {
        self.touch();
        let mut store = self.lock();
        let docs = store.entry(collection.to_string()).or_default();
        let mut outcome = UpdateOutcome {
            matched: 0,
            modified: 0,
        };
        for doc in docs.iter_mut() {
            if matches(&filter, doc) {
                outcome.matched += 1;
                outcome.modified += u64::from(apply_update(doc, &update));
            }
        }
        Ok(outcome)
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> Result<DeleteOutcome> {
        self.touch();
        let mut store = self.lock();
        let docs = store.entry(collection.to_string()).or_default();
        if let Some(index) = docs.iter().position(|doc| matches(&filter, doc)) {
            docs.remove(index);
            return Ok(DeleteOutcome { deleted: 1 });
        }
        Ok(DeleteOutcome { deleted: 0 })
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> Result<DeleteOutcome> {
        self.touch();
        let mut store = self.lock();
        let docs = store.entry(collection.to_string()).or_default();
        let before = docs.len();
        docs.retain(|doc| !matches(&filter, doc));
        Ok(DeleteOutcome {
            deleted: (before - docs.len()) as u64,
        })
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

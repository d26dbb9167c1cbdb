//! Retrace Docstore - Outbound Document-Store Adapter
//!
//! This crate intercepts collection-level CRUD against any backend
//! implementing [`DocumentBackend`]:
//! - Backend: the capability seam concrete document clients implement
//! - Collection: the mode-aware recording wrapper and its cursor
//! - Memory: an in-process backend for tests and demos

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod collection;
pub mod error;
pub mod memory;

pub use backend::{
    DeleteOutcome, Document, DocumentBackend, InsertManyOutcome, InsertOneOutcome, UpdateOutcome,
};
pub use collection::{DocumentCursor, RecordingCollection};
pub use error::{Error, Result};
pub use memory::InMemoryBackend;

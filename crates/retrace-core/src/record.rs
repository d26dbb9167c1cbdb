//! Record - dependency call records and tagged opaque values
//!
//! A dependency call is described by a [`DependencyMeta`] and its outcome by
//! an optional [`ErrorRecord`] plus an ordered sequence of [`RecordedValue`]s.
//! Values are tagged JSON payloads: each adapter encodes its native result
//! type at the boundary and decodes it back on replay, so the engine never
//! assumes a concrete type for any dependency kind.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The family of external system a dependency call targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    /// Relational database
    Sql,
    /// Document-oriented database
    DocumentDb,
    /// HTTP backend
    Http,
    /// RPC peer
    Rpc,
}

impl DependencyKind {
    /// Returns the string representation of the kind
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sql => "sql",
            Self::DocumentDb => "document_db",
            Self::Http => "http",
            Self::Rpc => "rpc",
        }
    }
}

impl std::fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity of one dependency call, used for diagnostics and drift detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyMeta {
    /// Dependency name (connection target, collection, service)
    pub name: String,
    /// Dependency family
    pub kind: DependencyKind,
    /// Operation performed (e.g. `Ping`, `FindOne`, `GET /users`)
    pub operation: String,
}

impl DependencyMeta {
    /// Create a new meta descriptor
    #[must_use]
    pub fn new(name: impl Into<String>, kind: DependencyKind, operation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            operation: operation.into(),
        }
    }
}

impl std::fmt::Display for DependencyMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.name, self.operation)
    }
}

/// A recorded dependency failure.
///
/// Original error types cannot be rebuilt across process boundaries; the
/// message is the recorded contract, reproduced verbatim on replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Error message as produced by the real dependency
    pub message: String,
}

impl ErrorRecord {
    /// Create an error record from a message
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Create an error record from any displayable error
    #[must_use]
    pub fn of(err: &dyn std::fmt::Display) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

/// A tagged opaque value captured from a dependency call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedValue {
    /// Adapter-chosen tag naming the payload shape (e.g. `rows`, `http_response`)
    pub tag: String,
    /// The payload itself
    pub value: serde_json::Value,
}

impl RecordedValue {
    /// Encode a typed value under the given tag
    pub fn of<T: Serialize>(tag: impl Into<String>, value: &T) -> Result<Self> {
        Ok(Self {
            tag: tag.into(),
            value: serde_json::to_value(value).map_err(|e| Error::Serialization(e.to_string()))?,
        })
    }

    /// Decode the payload back to its typed form
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.value.clone()).map_err(|e| {
            Error::Serialization(format!("decoding value tagged {:?}: {e}", self.tag))
        })
    }
}

/// One recorded dependency call: identity, optional failure, ordered results.
///
/// Produced once per call during capture; consumed once per matching call
/// during replay, in positional order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyRecord {
    /// Dependency name
    pub name: String,
    /// Dependency family
    pub kind: DependencyKind,
    /// Operation performed
    pub operation: String,
    /// Failure produced by the real call, if any
    pub error: Option<ErrorRecord>,
    /// Ordered result values
    pub results: Vec<RecordedValue>,
}

impl DependencyRecord {
    /// Create a record from a call's meta and outcome
    #[must_use]
    pub fn new(meta: DependencyMeta, error: Option<ErrorRecord>, results: Vec<RecordedValue>) -> Self {
        Self {
            name: meta.name,
            kind: meta.kind,
            operation: meta.operation,
            error,
            results,
        }
    }

    /// The identity this record was captured under
    #[must_use]
    pub fn meta(&self) -> DependencyMeta {
        DependencyMeta::new(self.name.clone(), self.kind, self.operation.clone())
    }

    /// Whether this record was captured for the given call identity
    #[must_use]
    pub fn matches(&self, meta: &DependencyMeta) -> bool {
        self.name == meta.name && self.kind == meta.kind && self.operation == meta.operation
    }
}

//! Snapshot - request/response snapshots and the assembled test case

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codec;
use crate::mode::Mode;
use crate::record::DependencyRecord;

/// Snapshot of one inbound request as received by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequestSnapshot {
    /// HTTP method
    pub method: String,
    /// Full request URI (path + query)
    pub uri: String,
    /// Header pairs in wire order; repeated names appear repeatedly
    pub headers: Vec<(String, String)>,
    /// Request body bytes
    #[serde(with = "codec::base64_bytes")]
    pub body: Vec<u8>,
    /// Named parameters recovered from the matched route
    pub path_params: BTreeMap<String, String>,
}

/// Snapshot of the response the service produced for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponseSnapshot {
    /// Final status code
    pub status: u16,
    /// Header pairs in wire order
    pub headers: Vec<(String, String)>,
    /// Fully concatenated body bytes
    #[serde(with = "codec::base64_bytes")]
    pub body: Vec<u8>,
}

impl HttpResponseSnapshot {
    /// The body as UTF-8, lossily converted (diagnostics, comparisons)
    #[must_use]
    pub fn body_utf8(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// One captured request lifecycle: the inbound request, the response it
/// produced, and every dependency call made in between, in call order.
///
/// Assembled at the end of a capture cycle and handed to the capture sink;
/// the engine retains nothing afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    /// Unique identifier
    pub id: Uuid,
    /// Application name this case was captured from
    pub app: String,
    /// When the capture completed
    pub captured_at: DateTime<Utc>,
    /// Mode under which the case was captured
    pub mode: Mode,
    /// The inbound request
    pub request: HttpRequestSnapshot,
    /// The response delivered to the caller
    pub response: HttpResponseSnapshot,
    /// Ordered dependency records
    pub dependencies: Vec<DependencyRecord>,
}

impl TestCase {
    /// Assemble a captured test case
    #[must_use]
    pub fn new(
        app: impl Into<String>,
        request: HttpRequestSnapshot,
        response: HttpResponseSnapshot,
        dependencies: Vec<DependencyRecord>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            app: app.into(),
            captured_at: Utc::now(),
            mode: Mode::Capture,
            request,
            response,
            dependencies,
        }
    }
}

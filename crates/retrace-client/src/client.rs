//! Client - recording wrapper around reqwest
//!
//! `RecordingHttpClient` holds a real `reqwest::Client` and forwards requests
//! to it in capture and off modes. In capture the full response is read,
//! recorded as a tagged snapshot, and rebuilt for the caller; in replay the
//! response is synthesized entirely from the recorded snapshot and the
//! network is never touched.

use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use reqwest::{Client, IntoUrl, Request, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use retrace_core::{
    codec, process_dependency_in, recording_enabled, DependencyKind, DependencyMeta,
    ErrorRecord, ExecutionContext, Interception, Mode, RecordedValue,
};

use crate::error::{Error, Result};

/// Tag under which HTTP responses are recorded
const RESPONSE_TAG: &str = "http_response";

/// Recorded shape of one backend HTTP response
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HttpCallRecord {
    status: u16,
    headers: Vec<(String, String)>,
    #[serde(with = "codec::base64_bytes")]
    body: Vec<u8>,
}

/// Mode-aware HTTP client wrapping a real `reqwest::Client`
#[derive(Debug, Clone, Default)]
pub struct RecordingHttpClient {
    inner: Client,
}

impl RecordingHttpClient {
    /// Wrap an existing client (keeps its pool, TLS, and timeout settings)
    #[must_use]
    pub fn new(inner: Client) -> Self {
        Self { inner }
    }

    /// The wrapped client, for requests that must bypass interception
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.inner
    }

    /// Execute a GET request against the given URL
    pub async fn get(&self, url: impl IntoUrl) -> Result<Response> {
        self.execute(self.inner.get(url).build()?).await
    }

    /// Execute a POST request with the given body
    pub async fn post(&self, url: impl IntoUrl, body: impl Into<reqwest::Body>) -> Result<Response> {
        self.execute(self.inner.post(url).body(body).build()?).await
    }

    /// Execute a prepared request, recording or replaying per the current
    /// execution context.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        if !recording_enabled() {
            return Ok(self.inner.execute(request).await?);
        }
        let ctx = ExecutionContext::current()?;
        if ctx.mode().is_off() {
            return Ok(self.inner.execute(request).await?);
        }

        let meta = DependencyMeta::new(
            request.url().host_str().unwrap_or("http").to_string(),
            DependencyKind::Http,
            format!("{} {}", request.method(), request.url().path()),
        );

        if ctx.mode() == Mode::Replay {
            return self.replay(&ctx, meta);
        }
        self.capture(&ctx, meta, request).await
    }

    fn replay(&self, ctx: &ExecutionContext, meta: DependencyMeta) -> Result<Response> {
        match process_dependency_in(ctx, meta, None, Vec::new())? {
            Interception::Mocked {
                error: Some(err), ..
            } => Err(Error::Replayed(err.message)),
            Interception::Mocked { results, .. } => {
                let record: HttpCallRecord = results
                    .first()
                    .ok_or_else(|| Error::InvalidRecord("record has no response value".into()))?
                    .decode()?;
                build_response(&record)
            }
            Interception::Passthrough { .. } => Err(Error::Core(
                retrace_core::Error::InvalidMode("passthrough outcome during replay".into()),
            )),
        }
    }

    async fn capture(
        &self,
        ctx: &ExecutionContext,
        meta: DependencyMeta,
        request: Request,
    ) -> Result<Response> {
        let outcome = self.read_full(request).await;
        match outcome {
            Ok((status, headers, body)) => {
                let record = HttpCallRecord {
                    status: status.as_u16(),
                    headers: header_pairs(&headers),
                    body: body.clone(),
                };
                process_dependency_in(
                    ctx,
                    meta,
                    None,
                    vec![RecordedValue::of(RESPONSE_TAG, &record)?],
                )?;
                debug!(status = record.status, "recorded backend response");
                build_response(&record)
            }
            Err(err) => {
                process_dependency_in(ctx, meta, Some(ErrorRecord::of(&err)), Vec::new())?;
                Err(err.into())
            }
        }
    }

    /// Perform the real call and drain the body so it can be both recorded
    /// and handed back to the caller.
    async fn read_full(
        &self,
        request: Request,
    ) -> std::result::Result<(StatusCode, HeaderMap, Vec<u8>), reqwest::Error> {
        let response = self.inner.execute(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok((status, headers, body.to_vec()))
    }
}

fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

/// Rebuild a caller-facing response from a recorded snapshot
fn build_response(record: &HttpCallRecord) -> Result<Response> {
    let status = StatusCode::from_u16(record.status)
        .map_err(|e| Error::InvalidRecord(format!("status {}: {e}", record.status)))?;

    let mut rebuilt = http::Response::new(reqwest::Body::from(record.body.clone()));
    *rebuilt.status_mut() = status;
    let headers = rebuilt.headers_mut();
    for (name, value) in &record.headers {
        match (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => warn!(%name, "skipping unrepresentable recorded header"),
        }
    }
    Ok(Response::from(rebuilt))
}

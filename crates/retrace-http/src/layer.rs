//! Layer - tower middleware implementing the request-capture lifecycle
//!
//! `RecordLayer` wraps an axum router (or any tower service speaking axum's
//! request/response types). Per request it decides the mode from the replay
//! marker header, establishes the execution context for the handler's call
//! tree, buffers the request body so the handler still reads a fresh copy,
//! and tees the response body into a snapshot that completes the capture or
//! replay cycle once the last byte is delivered (or the request is canceled).

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::response::Response;
use bytes::Bytes;
use http::{HeaderMap, Request};
use tower::{Layer, Service};
use tracing::{error, warn};

use retrace_core::{
    recording_enabled, ExecutionContext, HttpRequestSnapshot, HttpResponseSnapshot, Mode, Recorder,
};

use crate::params::extract_path_params;
use crate::tee::TeeBody;

/// Tower layer installing the Retrace capture lifecycle
#[derive(Clone)]
pub struct RecordLayer {
    recorder: Arc<Recorder>,
}

impl RecordLayer {
    /// Create a layer sharing the given recorder
    #[must_use]
    pub fn new(recorder: Arc<Recorder>) -> Self {
        Self { recorder }
    }
}

impl<S> Layer<S> for RecordLayer {
    type Service = RecordService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RecordService {
            inner,
            recorder: Arc::clone(&self.recorder),
        }
    }
}

/// Service produced by [`RecordLayer`]
#[derive(Clone)]
pub struct RecordService<S> {
    inner: S,
    recorder: Arc<Recorder>,
}

impl<S> Service<Request<Body>> for RecordService<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        // Swap in a clone so the ready service is the one we call.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        if !recording_enabled() {
            return Box::pin(inner.call(req));
        }

        let recorder = Arc::clone(&self.recorder);
        Box::pin(async move { Ok(run(inner, recorder, req).await) })
    }
}

async fn run<S>(mut inner: S, recorder: Arc<Recorder>, req: Request<Body>) -> Response
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Send,
    S::Future: Send,
{
    let marker = extract_marker(&req, recorder.replay_header());
    let ctx = match recorder.begin_request(marker.as_deref()).await {
        Ok(ctx) => ctx,
        Err(err) => {
            warn!(%err, "replay setup failed; serving request without interception");
            ExecutionContext::passthrough()
        }
    };

    if ctx.mode().is_off() {
        return infallible(inner.call(req).await);
    }

    let (req, request_snapshot) = if ctx.mode() == Mode::Capture {
        buffer_request(req, recorder.config().max_body_bytes).await
    } else {
        (req, None)
    };
    if ctx.mode() == Mode::Capture && request_snapshot.is_none() {
        // Buffering failed; the request proceeds but nothing is captured.
        return infallible(inner.call(req).await);
    }

    let response = infallible(ctx.scope(inner.call(req)).await);

    let (parts, body) = response.into_parts();
    let completion = Completion {
        recorder,
        ctx,
        request: request_snapshot,
        status: parts.status.as_u16(),
        headers: header_pairs(&parts.headers),
    };
    let tee = TeeBody::new(body, move |bytes| completion.finish(bytes));
    Response::from_parts(parts, Body::new(tee))
}

/// End-of-response state; fires when the tee delivers the final body bytes
struct Completion {
    recorder: Arc<Recorder>,
    ctx: Arc<ExecutionContext>,
    request: Option<HttpRequestSnapshot>,
    status: u16,
    headers: Vec<(String, String)>,
}

impl Completion {
    fn finish(self, body: Bytes) {
        let response = HttpResponseSnapshot {
            status: self.status,
            headers: self.headers,
            body: body.to_vec(),
        };

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime available to flush capture state");
            return;
        };

        match self.ctx.mode() {
            Mode::Capture => {
                let Some(request) = self.request else {
                    // Unreachable through `run`; buffering failures skip the tee.
                    warn!("capture completed without a request snapshot; dropped");
                    return;
                };
                let recorder = self.recorder;
                let ctx = self.ctx;
                handle.spawn(async move {
                    if let Err(err) = recorder.finish_capture(&ctx, request, response).await {
                        error!(%err, "failed to emit captured test case");
                    }
                });
            }
            Mode::Replay => {
                let Some(test_id) = self.ctx.test_id().map(str::to_owned) else {
                    return;
                };
                let recorder = self.recorder;
                handle.spawn(async move {
                    if let Err(err) = recorder.finish_replay(&test_id, response).await {
                        error!(%err, %test_id, "failed to report replayed response");
                    }
                });
            }
            Mode::Off => {}
        }
    }
}

fn extract_marker(req: &Request<Body>, header: &str) -> Option<String> {
    req.headers()
        .get(header)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

/// Buffer the request body and reinstate a fresh readable copy.
///
/// On failure the request is rebuilt with an empty body so real traffic is
/// still served; the missing snapshot aborts capture for this request.
async fn buffer_request(
    req: Request<Body>,
    limit: usize,
) -> (Request<Body>, Option<HttpRequestSnapshot>) {
    let (parts, body) = req.into_parts();
    match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => {
            let path_params = parts
                .extensions
                .get::<MatchedPath>()
                .map(|matched| extract_path_params(matched.as_str(), parts.uri.path()))
                .unwrap_or_default();
            let snapshot = HttpRequestSnapshot {
                method: parts.method.to_string(),
                uri: parts.uri.to_string(),
                headers: header_pairs(&parts.headers),
                body: bytes.to_vec(),
                path_params,
            };
            (Request::from_parts(parts, Body::from(bytes)), Some(snapshot))
        }
        Err(err) => {
            error!(%err, "failed to buffer request body; capture aborted for this request");
            (Request::from_parts(parts, Body::empty()), None)
        }
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

fn infallible<T>(result: Result<T, Infallible>) -> T {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

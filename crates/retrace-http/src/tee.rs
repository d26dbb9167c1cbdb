//! Tee - fan-out response body wrapper
//!
//! [`TeeBody`] forwards every frame of the wrapped body to the real caller
//! unchanged while duplicating data frames into an in-memory buffer. The
//! finalizer runs exactly once with the concatenated bytes: on clean
//! end-of-stream with the full body, or on drop with whatever was produced
//! before the request was canceled. A body error discards the finalizer
//! instead, so a partial capture never masquerades as a complete one.

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use bytes::{Bytes, BytesMut};
use http_body::{Body as HttpBody, Frame, SizeHint};
use tracing::warn;

type Finalizer = Box<dyn FnOnce(Bytes) + Send + 'static>;

/// Response body wrapper duplicating data frames into a capture buffer
pub struct TeeBody {
    inner: Body,
    captured: BytesMut,
    finalizer: Option<Finalizer>,
}

impl TeeBody {
    /// Wrap a body; `finalizer` receives the concatenated bytes once
    pub fn new(inner: Body, finalizer: impl FnOnce(Bytes) + Send + 'static) -> Self {
        Self {
            inner,
            captured: BytesMut::new(),
            finalizer: Some(Box::new(finalizer)),
        }
    }

    fn finalize(&mut self) {
        if let Some(finalizer) = self.finalizer.take() {
            finalizer(self.captured.split().freeze());
        }
    }

    fn abort(&mut self) {
        self.finalizer = None;
    }
}

impl HttpBody for TeeBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.captured.extend_from_slice(data);
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(Some(Err(err))) => {
                warn!(%err, "response body failed mid-stream; capture aborted");
                this.abort();
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                this.finalize();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for TeeBody {
    fn drop(&mut self) {
        // Canceled mid-stream: flush whatever was captured.
        self.finalize();
    }
}

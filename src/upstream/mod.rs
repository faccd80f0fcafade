//! Upstream prompt-testing client.
//!
//! [`UpstreamClient`] opens the backend streaming call for one session and
//! yields [`StreamEvent`]s. Implementations produce raw
//! [`UpstreamChunk`]s and run them through [`normalize`], which enforces
//! the event contract: zero or more `Content` events, then exactly one
//! `Terminal` or `Error`, then nothing.

pub mod backpressure;
pub mod credential;
#[cfg(feature = "grpc")]
pub mod grpc;

pub use backpressure::{BoundedStream, DEFAULT_STREAM_BUFFER, bounded_stream};
pub use credential::{CredentialIssuer, JwtIssuer, SessionCredential};
#[cfg(feature = "grpc")]
pub use grpc::GrpcUpstream;

use std::collections::VecDeque;
use std::pin::Pin;

use futures_util::{Stream, StreamExt, stream};

use crate::Result;
use crate::types::{ERROR_FINISH_REASON, EventStream, StreamEvent, UpstreamChunk, UpstreamRequest};

/// Raw chunk stream before normalisation.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<UpstreamChunk>> + Send>>;

/// Opens backend streaming calls.
///
/// The returned stream is lazy: nothing is sent until it is first polled,
/// and dropping it cancels the call. A call that cannot be established
/// yields a single `Error` event.
pub trait UpstreamClient: Send + Sync {
    fn stream(&self, request: UpstreamRequest, credential: SessionCredential) -> EventStream;
}

/// Message used when the backend reports `finish_reason = "error"`.
const UPSTREAM_FAILED: &str = "prompt test failed upstream";

struct Normalizer {
    chunks: ChunkStream,
    pending: VecDeque<StreamEvent>,
    finished: bool,
}

impl Normalizer {
    fn push_chunk(&mut self, chunk: UpstreamChunk) {
        if !chunk.content.is_empty() {
            self.pending.push_back(StreamEvent::Content(chunk.content));
        }

        let backend_request_id = chunk.backend_request_id.filter(|id| !id.is_empty());
        match chunk.finish_reason {
            Some(reason) if reason == ERROR_FINISH_REASON => {
                self.finish(StreamEvent::Error(UPSTREAM_FAILED.to_string()));
            }
            Some(reason) => self.finish(StreamEvent::Terminal {
                finish_reason: Some(reason),
                backend_request_id,
            }),
            None if backend_request_id.is_some() => self.finish(StreamEvent::Terminal {
                finish_reason: None,
                backend_request_id,
            }),
            None => {}
        }
    }

    fn finish(&mut self, event: StreamEvent) {
        self.pending.push_back(event);
        self.finished = true;
    }
}

/// Turn raw chunks into a well-formed event stream.
///
/// - non-empty content becomes `Content`;
/// - `finish_reason = "error"` becomes `Error`;
/// - any other finish reason, or a backend request id, becomes `Terminal`;
/// - a graceful end without either becomes `Terminal` with no finish reason;
/// - a transport error becomes `Error`.
///
/// The inner stream is not polled again after the final event.
pub fn normalize(chunks: ChunkStream) -> EventStream {
    let state = Normalizer {
        chunks,
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((event, state));
            }
            if state.finished {
                return None;
            }
            match state.chunks.next().await {
                Some(Ok(chunk)) => state.push_chunk(chunk),
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "upstream stream failed");
                    state.finish(StreamEvent::Error(e.to_string()));
                }
                None => state.finish(StreamEvent::Terminal {
                    finish_reason: None,
                    backend_request_id: None,
                }),
            }
        }
    }))
}

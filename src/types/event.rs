//! Upstream streaming event types

use std::pin::Pin;

use futures_util::Stream;

/// Events produced by an [`UpstreamClient`](crate::upstream::UpstreamClient)
/// and consumed by the [`StreamBridge`](crate::bridge::StreamBridge).
///
/// A well-formed sequence is zero or more `Content` events followed by
/// exactly one `Terminal` or `Error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Incremental generated text.
    Content(String),

    /// Normal end of stream.
    Terminal {
        /// Reason the model stopped. `None` when the upstream closed the
        /// stream without saying why.
        finish_reason: Option<String>,
        /// Id of the request record persisted by the backend, if any.
        backend_request_id: Option<String>,
    },

    /// Abnormal end of stream.
    Error(String),
}

impl StreamEvent {
    /// Whether this event ends the stream.
    pub fn is_final(&self) -> bool {
        !matches!(self, StreamEvent::Content(_))
    }
}

/// Boxed event stream returned by upstream clients.
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// One raw message from the upstream streaming call, before normalisation
/// into [`StreamEvent`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamChunk {
    pub content: String,
    pub finish_reason: Option<String>,
    pub backend_request_id: Option<String>,
}

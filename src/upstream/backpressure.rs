//! Streaming backpressure via bounded channels.
//!
//! The upstream call is driven by its own producer task and handed to the
//! session through a bounded `mpsc` channel, so a fast backend blocks
//! instead of filling memory when the client socket is slow. Dropping the
//! consumer side aborts the producer, which cancels the upstream call.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use pin_project_lite::pin_project;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

/// Default number of events buffered between producer and consumer.
pub const DEFAULT_STREAM_BUFFER: usize = 64;

pin_project! {
    /// Consumer half of [`bounded_stream`]. Aborts the producer on drop.
    pub struct BoundedStream<T> {
        #[pin]
        inner: ReceiverStream<T>,
        producer: JoinHandle<()>,
    }

    impl<T> PinnedDrop for BoundedStream<T> {
        fn drop(this: Pin<&mut Self>) {
            this.project().producer.abort();
        }
    }
}

impl<T> Stream for BoundedStream<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.project().inner.poll_next(cx)
    }
}

/// Drive `inner` on a spawned task, buffering at most `buffer_size` items.
///
/// A buffer size of zero is treated as one.
///
/// # Panics
///
/// Requires a tokio runtime context.
pub fn bounded_stream<S>(inner: S, buffer_size: usize) -> BoundedStream<S::Item>
where
    S: Stream + Send + 'static,
    S::Item: Send + 'static,
{
    let (tx, rx) = tokio::sync::mpsc::channel(buffer_size.max(1));

    let producer = tokio::spawn(async move {
        let mut inner = Box::pin(inner);
        while let Some(item) = inner.next().await {
            if tx.send(item).await.is_err() {
                break; // receiver dropped
            }
        }
    });

    BoundedStream {
        inner: ReceiverStream::new(rx),
        producer,
    }
}

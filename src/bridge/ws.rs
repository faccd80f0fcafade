//! axum websocket adapter for [`StreamBridge`].

use std::borrow::Cow;

use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, Stream, StreamExt};

use super::{ClientFrame, FrameSink, SessionReport, StreamBridge};
use crate::types::TestResultFrame;
use crate::{HuginnError, Result};

/// Close reasons must fit in a single control frame.
const MAX_CLOSE_REASON: usize = 123;

/// Outbound half of an axum websocket.
pub struct WsSink {
    inner: SplitSink<WebSocket, Message>,
}

impl WsSink {
    pub fn new(inner: SplitSink<WebSocket, Message>) -> Self {
        Self { inner }
    }

    async fn write(&mut self, message: Message) -> Result<()> {
        self.inner
            .send(message)
            .await
            .map_err(|e| HuginnError::SocketWrite(e.to_string()))
    }
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send_result(&mut self, frame: &TestResultFrame) -> Result<()> {
        let payload = serde_json::to_string(frame)?;
        self.write(Message::Text(payload)).await
    }

    async fn send_pong(&mut self, payload: Vec<u8>) -> Result<()> {
        self.write(Message::Pong(payload)).await
    }

    async fn close(&mut self, code: u16, reason: &str) -> Result<()> {
        let frame = CloseFrame {
            code,
            reason: Cow::Owned(truncate(reason, MAX_CLOSE_REASON).to_string()),
        };
        self.write(Message::Close(Some(frame))).await?;
        self.inner
            .close()
            .await
            .map_err(|e| HuginnError::SocketWrite(e.to_string()))
    }
}

fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Map axum messages to [`ClientFrame`]s. Receive errors end the session.
pub fn inbound(stream: SplitStream<WebSocket>) -> impl Stream<Item = ClientFrame> + Send + Unpin {
    stream.map(|message| match message {
        Ok(Message::Text(text)) => ClientFrame::Text(text),
        Ok(Message::Binary(data)) => ClientFrame::Binary(data),
        Ok(Message::Ping(data)) => ClientFrame::Ping(data),
        Ok(Message::Pong(data)) => ClientFrame::Pong(data),
        Ok(Message::Close(_)) => ClientFrame::Close,
        Err(e) => {
            tracing::debug!(error = %e, "websocket receive error");
            ClientFrame::Close
        }
    })
}

/// Run a bridge session over an upgraded socket.
pub async fn serve(
    bridge: &StreamBridge,
    application_id: &str,
    socket: WebSocket,
) -> SessionReport {
    let (sink, stream) = socket.split();
    bridge
        .run(application_id, inbound(stream), WsSink::new(sink))
        .await
}

//! Transport-neutral socket frames.

use async_trait::async_trait;

use crate::Result;
use crate::types::TestResultFrame;

/// Text payload clients may send as an application-level keep-alive.
pub const PING_TEXT: &str = "ping";

/// One inbound frame from the client socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    Text(String),
    Binary(Vec<u8>),
    /// Protocol ping. The transport answers it.
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    /// Close frame or end of the inbound stream.
    Close,
}

impl ClientFrame {
    /// Whether this frame only renews the keep-alive deadline.
    pub fn is_keepalive(&self) -> bool {
        match self {
            ClientFrame::Ping(_) | ClientFrame::Pong(_) => true,
            ClientFrame::Text(text) => text == PING_TEXT,
            _ => false,
        }
    }
}

/// Outbound half of a client socket.
///
/// A failed write is terminal for the session; nothing is retried.
#[async_trait]
pub trait FrameSink: Send {
    /// Write one JSON result frame.
    async fn send_result(&mut self, frame: &TestResultFrame) -> Result<()>;

    /// Answer an application-level ping.
    async fn send_pong(&mut self, payload: Vec<u8>) -> Result<()>;

    /// Send a close frame and shut the socket.
    async fn close(&mut self, code: u16, reason: &str) -> Result<()>;
}

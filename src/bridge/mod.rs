//! Prompt-test streaming bridge.
//!
//! [`StreamBridge`] runs one interactive session per client socket. It
//! relays a single upstream prompt-test stream to the client as JSON
//! [`TestResultFrame`](crate::types::TestResultFrame)s and records a
//! transcript when the run completes.
//!
//! # Session lifecycle
//!
//! ```text
//! Idle ──upgrade──▶ Open ──first data frame──▶ Streaming ──terminal──▶ Draining ──▶ Closed
//!                    │                            │
//!                    └──── timeout / close ───────┴──── error / timeout / close ──▶ Closed
//! ```
//!
//! While `Open` or `Streaming`, a keep-alive deadline runs. Protocol pings,
//! pongs and the text frame `"ping"` renew it; letting it lapse closes the
//! session with [`close_code::KEEPALIVE_TIMEOUT`].
//!
//! Inbound frames and upstream events are two producers feeding one loop.
//! Inbound frames are polled first so a busy upstream stream never delays
//! keep-alives or a client close. The keep-alive deadline comes next: once
//! it has passed, no further upstream event is relayed, even mid-stream.
//! The upstream call is owned by the session and is aborted as soon as the
//! session ends.

mod frame;
mod session;
#[cfg(feature = "server")]
pub mod ws;

pub use frame::{ClientFrame, FrameSink, PING_TEXT};

use std::sync::Arc;
use std::time::Duration;

use futures_util::Stream;
use uuid::Uuid;

use crate::configs::PromptConfigs;
use crate::transcript::TranscriptRecorder;
use crate::upstream::{CredentialIssuer, DEFAULT_STREAM_BUFFER, UpstreamClient};

/// WebSocket close codes sent by the bridge.
pub mod close_code {
    /// Run completed.
    pub const NORMAL: u16 = 1000;
    /// Keep-alive deadline elapsed.
    pub const KEEPALIVE_TIMEOUT: u16 = 1001;
    /// First data frame could not be parsed or failed validation.
    pub const INVALID_PAYLOAD: u16 = 1007;
    /// Upstream or server-side failure.
    pub const SERVER_ERROR: u16 = 1011;
}

/// Default keep-alive window.
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Open,
    Streaming,
    Draining,
    Closed,
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Terminal event relayed.
    Completed,
    /// Upstream or server-side error relayed as an error frame.
    Failed,
    /// Invalid first data frame; no upstream call was made.
    Rejected,
    /// Keep-alive deadline elapsed.
    TimedOut,
    /// Client closed the socket.
    ClientClosed,
    /// Writing to the client failed.
    WriteFailed,
}

impl SessionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionOutcome::Completed => "completed",
            SessionOutcome::Failed => "failed",
            SessionOutcome::Rejected => "rejected",
            SessionOutcome::TimedOut => "timed_out",
            SessionOutcome::ClientClosed => "client_closed",
            SessionOutcome::WriteFailed => "write_failed",
        }
    }
}

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub session_id: String,
    pub outcome: SessionOutcome,
    /// States entered, in order, starting with `Idle`.
    pub transitions: Vec<SessionState>,
    pub frames_sent: usize,
    pub upstream_opened: bool,
    pub transcript_id: Option<String>,
}

/// Per-session tuning.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Keep-alive window. Default: 60 seconds.
    pub keepalive: Duration,
    /// Upstream events buffered ahead of the client. Default: 64.
    pub stream_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            keepalive: DEFAULT_KEEPALIVE,
            stream_buffer: DEFAULT_STREAM_BUFFER,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keepalive(mut self, keepalive: Duration) -> Self {
        self.keepalive = keepalive;
        self
    }

    pub fn stream_buffer(mut self, size: usize) -> Self {
        self.stream_buffer = size;
        self
    }
}

/// Runs prompt-test sessions. Shared by every connection.
#[derive(Clone)]
pub struct StreamBridge {
    upstream: Arc<dyn UpstreamClient>,
    credentials: Arc<dyn CredentialIssuer>,
    configs: PromptConfigs,
    recorder: TranscriptRecorder,
    config: SessionConfig,
}

impl StreamBridge {
    pub fn new(
        upstream: Arc<dyn UpstreamClient>,
        credentials: Arc<dyn CredentialIssuer>,
        configs: PromptConfigs,
        recorder: TranscriptRecorder,
    ) -> Self {
        Self {
            upstream,
            credentials,
            configs,
            recorder,
            config: SessionConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Serve one session until it closes.
    ///
    /// `inbound` ending is treated like a client close.
    pub async fn run<I, O>(&self, application_id: &str, inbound: I, outbound: O) -> SessionReport
    where
        I: Stream<Item = ClientFrame> + Send + Unpin,
        O: FrameSink,
    {
        let session_id = Uuid::now_v7().to_string();
        session::Session::new(self, session_id, application_id.to_string(), outbound)
            .run(inbound)
            .await
    }
}

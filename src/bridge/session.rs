//! Fan-in loop of a single prompt-test session.

use std::collections::BTreeMap;

use futures_util::{Stream, StreamExt};
use tokio::time::Instant;
use tracing::instrument;

use super::{
    ClientFrame, FrameSink, PING_TEXT, SessionOutcome, SessionReport, SessionState, StreamBridge,
    close_code,
};
use crate::types::{NewTranscript, StreamEvent, TestResultFrame, TestRunRequest, UpstreamRequest};
use crate::upstream::{BoundedStream, bounded_stream};
use crate::{HuginnError, telemetry};

type Events = Option<BoundedStream<StreamEvent>>;

/// What woke the loop.
enum Wake {
    Frame(ClientFrame),
    Event(Option<StreamEvent>),
    Deadline,
}

enum Step {
    Continue,
    Finish(SessionOutcome),
}

/// The run started by the first data frame.
struct ActiveRun {
    session_name: String,
    prompt_config_id: String,
    variable_bindings: BTreeMap<String, String>,
    response_text: String,
}

pub(super) struct Session<'a, O> {
    bridge: &'a StreamBridge,
    id: String,
    application_id: String,
    sink: O,
    state: SessionState,
    transitions: Vec<SessionState>,
    frames_sent: usize,
    run: Option<ActiveRun>,
    upstream_opened: bool,
    recorded: bool,
    transcript_id: Option<String>,
}

async fn next_event(events: &mut Events) -> Option<StreamEvent> {
    match events {
        Some(events) => events.next().await,
        None => std::future::pending().await,
    }
}

impl<'a, O: FrameSink> Session<'a, O> {
    pub(super) fn new(
        bridge: &'a StreamBridge,
        id: String,
        application_id: String,
        sink: O,
    ) -> Self {
        Self {
            bridge,
            id,
            application_id,
            sink,
            state: SessionState::Idle,
            transitions: vec![SessionState::Idle],
            frames_sent: 0,
            run: None,
            upstream_opened: false,
            recorded: false,
            transcript_id: None,
        }
    }

    #[instrument(skip_all, fields(session_id = %self.id, application_id = %self.application_id))]
    pub(super) async fn run<I>(mut self, mut inbound: I) -> SessionReport
    where
        I: Stream<Item = ClientFrame> + Send + Unpin,
    {
        let started = std::time::Instant::now();
        let keepalive = self.bridge.config.keepalive;
        let mut deadline = Instant::now() + keepalive;
        let mut events: Events = None;

        self.transition(SessionState::Open);
        tracing::info!("prompt test session opened");

        let outcome = loop {
            let wake = tokio::select! {
                biased;
                frame = inbound.next() => Wake::Frame(frame.unwrap_or(ClientFrame::Close)),
                // An expired window wins over pending upstream events.
                () = tokio::time::sleep_until(deadline) => Wake::Deadline,
                event = next_event(&mut events) => Wake::Event(event),
            };

            let step = match wake {
                Wake::Frame(frame) => {
                    if frame.is_keepalive() {
                        deadline = Instant::now() + keepalive;
                    }
                    self.on_frame(frame, &mut events).await
                }
                Wake::Event(event) => self.on_event(event).await,
                Wake::Deadline => self.on_deadline().await,
            };
            if let Step::Finish(outcome) = step {
                break outcome;
            }
        };

        // Dropping the stream aborts the upstream call.
        drop(events);
        self.transition(SessionState::Closed);

        let elapsed = started.elapsed().as_secs_f64();
        metrics::counter!(telemetry::SESSIONS_TOTAL, "outcome" => outcome.as_str()).increment(1);
        metrics::histogram!(telemetry::SESSION_DURATION_SECONDS, "outcome" => outcome.as_str())
            .record(elapsed);
        tracing::info!(
            outcome = outcome.as_str(),
            frames_sent = self.frames_sent,
            elapsed_secs = elapsed,
            "prompt test session closed"
        );

        SessionReport {
            session_id: self.id,
            outcome,
            transitions: self.transitions,
            frames_sent: self.frames_sent,
            upstream_opened: self.upstream_opened,
            transcript_id: self.transcript_id,
        }
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            tracing::debug!(from = ?self.state, to = ?next, "session state changed");
            self.state = next;
            self.transitions.push(next);
        }
    }

    async fn on_frame(&mut self, frame: ClientFrame, events: &mut Events) -> Step {
        match frame {
            ClientFrame::Close => {
                tracing::debug!("client closed the socket");
                Step::Finish(SessionOutcome::ClientClosed)
            }
            ClientFrame::Ping(_) | ClientFrame::Pong(_) => Step::Continue,
            ClientFrame::Text(text) if text == PING_TEXT => {
                match self.sink.send_pong(text.into_bytes()).await {
                    Ok(()) => Step::Continue,
                    Err(e) => self.write_failed(e),
                }
            }
            ClientFrame::Text(text) if self.state == SessionState::Open => {
                self.start(&text, events).await
            }
            ClientFrame::Binary(_) if self.state == SessionState::Open => {
                self.transition(SessionState::Streaming);
                self.reject("binary frames are not supported").await
            }
            ClientFrame::Text(_) | ClientFrame::Binary(_) => {
                tracing::warn!("ignoring data frame received while a run is streaming");
                Step::Continue
            }
        }
    }

    /// Validate the first data frame and open the upstream stream.
    async fn start(&mut self, text: &str, events: &mut Events) -> Step {
        self.transition(SessionState::Streaming);

        let request = match TestRunRequest::from_frame(text) {
            Ok(request) => request,
            Err(e) => return self.reject(&e.to_string()).await,
        };

        let prompt_config_id = match self
            .bridge
            .configs
            .resolve_test_config(&self.application_id, &request)
            .await
        {
            Ok(id) => id,
            Err(e) if e.is_client_error() => return self.reject(&e.to_string()).await,
            Err(e) => return self.fail(&e.to_string()).await,
        };

        // Minted per session, never cached.
        let credential = match self.bridge.credentials.issue(&self.application_id) {
            Ok(credential) => credential,
            Err(e) => return self.fail(&e.to_string()).await,
        };

        let upstream_request =
            UpstreamRequest::from_test_run(&self.application_id, &prompt_config_id, &request);
        let session_name = request
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("prompt test {}", self.id));

        self.run = Some(ActiveRun {
            session_name,
            prompt_config_id: prompt_config_id.clone(),
            variable_bindings: request.template_variables,
            response_text: String::new(),
        });

        let stream = self.bridge.upstream.stream(upstream_request, credential);
        *events = Some(bounded_stream(stream, self.bridge.config.stream_buffer));
        self.upstream_opened = true;
        tracing::debug!(prompt_config_id = %prompt_config_id, "upstream stream opened");
        Step::Continue
    }

    async fn on_event(&mut self, event: Option<StreamEvent>) -> Step {
        match event {
            Some(StreamEvent::Content(text)) => {
                if let Some(run) = self.run.as_mut() {
                    run.response_text.push_str(&text);
                }
                match self.send(&TestResultFrame::content(text)).await {
                    Ok(()) => Step::Continue,
                    Err(e) => self.write_failed(e),
                }
            }
            Some(StreamEvent::Terminal {
                finish_reason,
                backend_request_id,
            }) => self.complete(finish_reason, backend_request_id).await,
            // Upstream ended without a terminal event.
            None => self.complete(None, None).await,
            Some(StreamEvent::Error(message)) => {
                tracing::warn!(error = %message, "upstream stream failed");
                self.fail(&message).await
            }
        }
    }

    async fn complete(
        &mut self,
        finish_reason: Option<String>,
        backend_request_id: Option<String>,
    ) -> Step {
        self.transition(SessionState::Draining);

        let transcript_id = match backend_request_id.filter(|id| !id.is_empty()) {
            Some(backend_request_id) => self.record(backend_request_id).await,
            None => None,
        };
        self.transcript_id = transcript_id.clone();

        let frame = TestResultFrame::terminal(finish_reason.unwrap_or_default(), transcript_id);
        if let Err(e) = self.send(&frame).await {
            return self.write_failed(e);
        }
        self.close(close_code::NORMAL, "completed").await;
        Step::Finish(SessionOutcome::Completed)
    }

    /// Persist the run. Runs at most once per session.
    async fn record(&mut self, backend_request_id: String) -> Option<String> {
        if self.recorded {
            tracing::warn!("transcript already recorded for this session");
            return None;
        }
        self.recorded = true;

        let run = self.run.take()?;
        let new = NewTranscript {
            application_id: self.application_id.clone(),
            prompt_config_id: run.prompt_config_id,
            session_name: run.session_name,
            variable_bindings: run.variable_bindings,
            response_text: run.response_text,
            backend_request_id,
        };
        match self.bridge.recorder.record(new).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(error = %e, "failed to record transcript");
                None
            }
        }
    }

    /// Relay an error as the terminal frame and close abnormally.
    async fn fail(&mut self, message: &str) -> Step {
        if let Err(e) = self.send(&TestResultFrame::error(message)).await {
            return self.write_failed(e);
        }
        self.close(close_code::SERVER_ERROR, "upstream error").await;
        Step::Finish(SessionOutcome::Failed)
    }

    async fn reject(&mut self, reason: &str) -> Step {
        tracing::info!(reason = %reason, "rejecting invalid prompt test request");
        self.close(close_code::INVALID_PAYLOAD, reason).await;
        Step::Finish(SessionOutcome::Rejected)
    }

    async fn on_deadline(&mut self) -> Step {
        tracing::info!("keep-alive deadline elapsed");
        self.close(close_code::KEEPALIVE_TIMEOUT, "keep-alive timeout").await;
        Step::Finish(SessionOutcome::TimedOut)
    }

    fn write_failed(&self, e: HuginnError) -> Step {
        tracing::warn!(error = %e, "failed to write to client");
        Step::Finish(SessionOutcome::WriteFailed)
    }

    async fn send(&mut self, frame: &TestResultFrame) -> crate::Result<()> {
        self.sink.send_result(frame).await?;
        self.frames_sent += 1;
        metrics::counter!(telemetry::FRAMES_SENT_TOTAL).increment(1);
        Ok(())
    }

    async fn close(&mut self, code: u16, reason: &str) {
        if let Err(e) = self.sink.close(code, reason).await {
            tracing::debug!(error = %e, code, "failed to send close frame");
        }
    }
}

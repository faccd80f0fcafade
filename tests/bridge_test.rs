//! Tests for prompt-test sessions driven through [`StreamBridge`].
//!
//! The socket is replaced by an in-memory inbound stream and a recording
//! sink; the backend by scripted upstream clients.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::stream::{self, Stream, StreamExt};
use huginn::bridge::{ClientFrame, FrameSink, SessionState, close_code};
use huginn::cache::{InvalidationPublisher, MemoryStore, ReadThroughCache};
use huginn::configs::{MemoryPromptConfigs, PromptConfigs};
use huginn::transcript::{MemoryTranscriptStore, TranscriptRecorder, TranscriptStore};
use huginn::types::{EventStream, NewPromptConfig, Transcript};
use huginn::upstream::{CredentialIssuer, SessionCredential, UpstreamClient};
use huginn::{
    HuginnError, Result, SessionConfig, SessionOutcome, StreamBridge, StreamEvent, TestResultFrame,
    UpstreamRequest,
};

const APP: &str = "app-1";

// ============================================================================
// Recording sink
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Sent {
    Result(TestResultFrame),
    Pong(Vec<u8>),
    Close(u16, String),
}

#[derive(Clone, Default)]
struct RecordingSink {
    sent: Arc<Mutex<Vec<Sent>>>,
    fail_writes: bool,
    write_delay: Duration,
}

impl RecordingSink {
    fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    fn results(&self) -> Vec<TestResultFrame> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Result(frame) => Some(frame),
                _ => None,
            })
            .collect()
    }

    fn close_code(&self) -> Option<u16> {
        self.sent().into_iter().find_map(|s| match s {
            Sent::Close(code, _) => Some(code),
            _ => None,
        })
    }
}

#[async_trait]
impl FrameSink for RecordingSink {
    async fn send_result(&mut self, frame: &TestResultFrame) -> Result<()> {
        if self.fail_writes {
            return Err(HuginnError::SocketWrite("broken pipe".into()));
        }
        if !self.write_delay.is_zero() {
            tokio::time::sleep(self.write_delay).await;
        }
        self.sent.lock().unwrap().push(Sent::Result(frame.clone()));
        Ok(())
    }

    async fn send_pong(&mut self, payload: Vec<u8>) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::Pong(payload));
        Ok(())
    }

    async fn close(&mut self, code: u16, reason: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Close(code, reason.to_string()));
        Ok(())
    }
}

// ============================================================================
// Mock upstream clients
// ============================================================================

/// Replays a fixed event list and records each call.
#[derive(Default)]
struct ScriptedUpstream {
    events: Vec<StreamEvent>,
    calls: Mutex<Vec<(UpstreamRequest, SessionCredential)>>,
}

impl ScriptedUpstream {
    fn new(events: Vec<StreamEvent>) -> Arc<Self> {
        Arc::new(Self {
            events,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(UpstreamRequest, SessionCredential)> {
        self.calls.lock().unwrap().clone()
    }
}

impl UpstreamClient for ScriptedUpstream {
    fn stream(&self, request: UpstreamRequest, credential: SessionCredential) -> EventStream {
        self.calls.lock().unwrap().push((request, credential));
        Box::pin(stream::iter(self.events.clone()))
    }
}

/// Sets a flag when dropped.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Emits its events and then never finishes.
struct HangingUpstream {
    first: Vec<StreamEvent>,
    dropped: Arc<AtomicBool>,
}

impl HangingUpstream {
    fn new(first: Vec<StreamEvent>) -> Arc<Self> {
        Arc::new(Self {
            first,
            dropped: Arc::new(AtomicBool::new(false)),
        })
    }

    fn was_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }
}

impl UpstreamClient for HangingUpstream {
    fn stream(&self, _request: UpstreamRequest, _credential: SessionCredential) -> EventStream {
        let guard = DropFlag(self.dropped.clone());
        let hang = stream::once(async move {
            let _guard = guard;
            std::future::pending::<StreamEvent>().await
        });
        Box::pin(stream::iter(self.first.clone()).chain(hang))
    }
}

// ============================================================================
// Mock credential issuer and transcript store
// ============================================================================

#[derive(Default)]
struct CountingIssuer {
    issued: AtomicUsize,
}

impl CredentialIssuer for CountingIssuer {
    fn issue(&self, application_id: &str) -> Result<SessionCredential> {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(SessionCredential::new(
            format!("{application_id}-token-{n}"),
            Utc::now() + chrono::Duration::seconds(60),
        ))
    }
}

struct FailingTranscripts;

#[async_trait]
impl TranscriptStore for FailingTranscripts {
    async fn insert(&self, _transcript: Transcript) -> Result<()> {
        Err(HuginnError::Storage("database unavailable".into()))
    }

    async fn get(&self, _id: &str) -> Result<Option<Transcript>> {
        Ok(None)
    }

    async fn list(&self, _application_id: &str) -> Result<Vec<Transcript>> {
        Ok(Vec::new())
    }
}

// ============================================================================
// Fixture
// ============================================================================

struct Fixture {
    bridge: StreamBridge,
    /// Id of a stored config the run requests may reference.
    config_id: String,
    configs: PromptConfigs,
    transcripts: Arc<MemoryTranscriptStore>,
    issuer: Arc<CountingIssuer>,
}

async fn fixture(upstream: Arc<dyn UpstreamClient>) -> Fixture {
    let transcripts = Arc::new(MemoryTranscriptStore::new());
    fixture_with(upstream, transcripts.clone(), transcripts).await
}

async fn fixture_with(
    upstream: Arc<dyn UpstreamClient>,
    store: Arc<dyn TranscriptStore>,
    transcripts: Arc<MemoryTranscriptStore>,
) -> Fixture {
    let cache = Arc::new(MemoryStore::new());
    let configs = PromptConfigs::new(
        Arc::new(MemoryPromptConfigs::new()),
        ReadThroughCache::new(cache.clone()),
        InvalidationPublisher::spawn(cache),
    );
    let issuer = Arc::new(CountingIssuer::default());
    let bridge = StreamBridge::new(
        upstream,
        issuer.clone(),
        configs.clone(),
        TranscriptRecorder::new(store),
    );
    let stored = configs
        .create(NewPromptConfig {
            application_id: APP.to_string(),
            name: "greeting".to_string(),
            model_vendor: "OPEN_AI".to_string(),
            model_type: "gpt-4".to_string(),
            model_parameters: serde_json::json!({}),
            provider_prompt_messages: serde_json::json!([{"role": "user", "content": "hi"}]),
            expected_template_variables: Vec::new(),
            is_test: false,
        })
        .await
        .unwrap();
    Fixture {
        bridge,
        config_id: stored.id,
        configs,
        transcripts,
        issuer,
    }
}

fn run_request(prompt_config_id: Option<&str>) -> String {
    let mut request = serde_json::json!({
        "name": "greeting",
        "modelVendor": "OPEN_AI",
        "modelType": "gpt-4",
        "modelParameters": {"temperature": 0.7},
        "providerPromptMessages": [{"role": "user", "content": "Say hello to {name}"}],
        "templateVariables": {"name": "Ada"}
    });
    if let Some(id) = prompt_config_id {
        request["promptConfigId"] = serde_json::json!(id);
    }
    request.to_string()
}

/// Inbound frames followed by a socket that stays open.
fn open_socket(frames: Vec<ClientFrame>) -> impl Stream<Item = ClientFrame> + Send + Unpin {
    stream::iter(frames).chain(stream::pending())
}

fn content(text: &str) -> StreamEvent {
    StreamEvent::Content(text.to_string())
}

fn terminal(reason: &str, record: Option<&str>) -> StreamEvent {
    StreamEvent::Terminal {
        finish_reason: Some(reason.to_string()),
        backend_request_id: record.map(str::to_string),
    }
}

// ============================================================================
// Completed runs
// ============================================================================

#[tokio::test]
async fn relays_content_in_order_then_terminal() {
    let upstream = ScriptedUpstream::new(vec![
        content("Hello"),
        content(", "),
        content("Ada"),
        terminal("done", Some("rec-1")),
    ]);
    let f = fixture(upstream.clone()).await;
    let sink = RecordingSink::default();

    let report = f
        .bridge
        .run(
            APP,
            open_socket(vec![ClientFrame::Text(run_request(Some(&f.config_id)))]),
            sink.clone(),
        )
        .await;

    assert_eq!(report.outcome, SessionOutcome::Completed);
    let transcript_id = report.transcript_id.clone().expect("transcript recorded");
    assert_eq!(
        sink.sent(),
        vec![
            Sent::Result(TestResultFrame::content("Hello")),
            Sent::Result(TestResultFrame::content(", ")),
            Sent::Result(TestResultFrame::content("Ada")),
            Sent::Result(TestResultFrame::terminal("done", Some(transcript_id))),
            Sent::Close(close_code::NORMAL, "completed".to_string()),
        ]
    );
    assert_eq!(report.frames_sent, 4);
}

#[tokio::test]
async fn completed_session_walks_every_state() {
    let upstream = ScriptedUpstream::new(vec![terminal("done", None)]);
    let f = fixture(upstream).await;

    let report = f
        .bridge
        .run(
            APP,
            open_socket(vec![ClientFrame::Text(run_request(Some(&f.config_id)))]),
            RecordingSink::default(),
        )
        .await;

    assert_eq!(
        report.transitions,
        vec![
            SessionState::Idle,
            SessionState::Open,
            SessionState::Streaming,
            SessionState::Draining,
            SessionState::Closed,
        ]
    );
}

#[tokio::test]
async fn transcript_links_run_to_backend_record() {
    let upstream = ScriptedUpstream::new(vec![
        content("Hello "),
        content("Ada"),
        terminal("done", Some("rec-42")),
    ]);
    let f = fixture(upstream).await;

    let report = f
        .bridge
        .run(
            APP,
            open_socket(vec![ClientFrame::Text(run_request(Some(&f.config_id)))]),
            RecordingSink::default(),
        )
        .await;

    let id = report.transcript_id.expect("transcript recorded");
    let transcript = f.transcripts.get(&id).await.unwrap().unwrap();
    assert_eq!(transcript.application_id, APP);
    assert_eq!(transcript.prompt_config_id, f.config_id);
    assert_eq!(transcript.session_name, "greeting");
    assert_eq!(transcript.response_text, "Hello Ada");
    assert_eq!(transcript.backend_request_id, "rec-42");
    assert_eq!(
        transcript.variable_bindings,
        BTreeMap::from([("name".to_string(), "Ada".to_string())])
    );
    assert_eq!(f.transcripts.len().await, 1);
}

#[tokio::test]
async fn unnamed_session_gets_generated_name() {
    let upstream = ScriptedUpstream::new(vec![terminal("done", Some("rec-1"))]);
    let f = fixture(upstream).await;
    let mut request: serde_json::Value =
        serde_json::from_str(&run_request(Some(&f.config_id))).unwrap();
    request.as_object_mut().unwrap().remove("name");

    let report = f
        .bridge
        .run(
            APP,
            open_socket(vec![ClientFrame::Text(request.to_string())]),
            RecordingSink::default(),
        )
        .await;

    let transcript = f
        .transcripts
        .get(&report.transcript_id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        transcript.session_name,
        format!("prompt test {}", report.session_id)
    );
}

#[tokio::test]
async fn terminal_without_record_skips_transcript() {
    let upstream = ScriptedUpstream::new(vec![content("hi"), terminal("stop", None)]);
    let f = fixture(upstream).await;
    let sink = RecordingSink::default();

    let report = f
        .bridge
        .run(
            APP,
            open_socket(vec![ClientFrame::Text(run_request(Some(&f.config_id)))]),
            sink.clone(),
        )
        .await;

    assert_eq!(report.outcome, SessionOutcome::Completed);
    assert!(report.transcript_id.is_none());
    assert!(f.transcripts.is_empty().await);
    let last = sink.results().pop().unwrap();
    assert_eq!(last, TestResultFrame::terminal("stop", None));
}

#[tokio::test]
async fn upstream_end_without_terminal_sends_empty_finish_reason() {
    let upstream = ScriptedUpstream::new(vec![content("partial")]);
    let f = fixture(upstream).await;
    let sink = RecordingSink::default();

    let report = f
        .bridge
        .run(
            APP,
            open_socket(vec![ClientFrame::Text(run_request(Some(&f.config_id)))]),
            sink.clone(),
        )
        .await;

    assert_eq!(report.outcome, SessionOutcome::Completed);
    let last = sink.results().pop().unwrap();
    assert_eq!(last.finish_reason.as_deref(), Some(""));
    assert_eq!(sink.close_code(), Some(close_code::NORMAL));
}

#[tokio::test]
async fn recorder_failure_still_completes_without_transcript_id() {
    let upstream = ScriptedUpstream::new(vec![content("hi"), terminal("done", Some("rec-1"))]);
    let f = fixture_with(
        upstream,
        Arc::new(FailingTranscripts),
        Arc::new(MemoryTranscriptStore::new()),
    )
    .await;
    let sink = RecordingSink::default();

    let report = f
        .bridge
        .run(
            APP,
            open_socket(vec![ClientFrame::Text(run_request(Some(&f.config_id)))]),
            sink.clone(),
        )
        .await;

    assert_eq!(report.outcome, SessionOutcome::Completed);
    assert!(report.transcript_id.is_none());
    let last = sink.results().pop().unwrap();
    assert_eq!(last.finish_reason.as_deref(), Some("done"));
    assert!(last.transcript_id.is_none());
}

// ============================================================================
// Upstream call
// ============================================================================

#[tokio::test]
async fn upstream_gets_request_and_fresh_credential() {
    let upstream = ScriptedUpstream::new(vec![terminal("done", None)]);
    let f = fixture(upstream.clone()).await;

    f.bridge
        .run(
            APP,
            open_socket(vec![ClientFrame::Text(run_request(Some(&f.config_id)))]),
            RecordingSink::default(),
        )
        .await;
    f.bridge
        .run(
            APP,
            open_socket(vec![ClientFrame::Text(run_request(Some(&f.config_id)))]),
            RecordingSink::default(),
        )
        .await;

    let calls = upstream.calls();
    assert_eq!(calls.len(), 2);
    let (request, credential) = &calls[0];
    assert_eq!(request.application_id, APP);
    assert_eq!(request.prompt_config_id, f.config_id);
    assert_eq!(request.model_type, "gpt-4");
    assert_eq!(request.template_variables["name"], "Ada");
    assert_eq!(credential.token(), "app-1-token-1");
    assert_eq!(calls[1].1.token(), "app-1-token-2");
    assert_eq!(f.issuer.issued.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn missing_config_id_creates_provisional_config() {
    let upstream = ScriptedUpstream::new(vec![terminal("done", None)]);
    let f = fixture(upstream.clone()).await;

    f.bridge
        .run(
            APP,
            open_socket(vec![ClientFrame::Text(run_request(None))]),
            RecordingSink::default(),
        )
        .await;

    let provisional: Vec<_> = f
        .configs
        .list(APP)
        .await
        .unwrap()
        .into_iter()
        .filter(|c| c.is_test)
        .collect();
    assert_eq!(provisional.len(), 1);
    assert!(!provisional[0].is_default);
    assert_eq!(upstream.calls()[0].0.prompt_config_id, provisional[0].id);
}

#[tokio::test]
async fn data_frames_during_streaming_are_ignored() {
    let upstream = ScriptedUpstream::new(vec![content("one"), terminal("done", None)]);
    let f = fixture(upstream.clone()).await;

    let report = f
        .bridge
        .run(
            APP,
            open_socket(vec![
                ClientFrame::Text(run_request(Some(&f.config_id))),
                ClientFrame::Text(run_request(Some("pc-2"))),
                ClientFrame::Binary(vec![1, 2, 3]),
            ]),
            RecordingSink::default(),
        )
        .await;

    assert_eq!(report.outcome, SessionOutcome::Completed);
    assert_eq!(upstream.calls().len(), 1);
    assert_eq!(upstream.calls()[0].0.prompt_config_id, f.config_id);
}

// ============================================================================
// Errors
// ============================================================================

#[tokio::test]
async fn upstream_error_ends_session() {
    let upstream = ScriptedUpstream::new(vec![
        content("partial"),
        StreamEvent::Error("model overloaded".into()),
        content("never sent"),
        terminal("done", Some("rec-1")),
    ]);
    let f = fixture(upstream).await;
    let sink = RecordingSink::default();

    let report = f
        .bridge
        .run(
            APP,
            open_socket(vec![ClientFrame::Text(run_request(Some(&f.config_id)))]),
            sink.clone(),
        )
        .await;

    assert_eq!(report.outcome, SessionOutcome::Failed);
    assert_eq!(
        sink.results(),
        vec![
            TestResultFrame::content("partial"),
            TestResultFrame::error("model overloaded"),
        ]
    );
    assert_eq!(sink.close_code(), Some(close_code::SERVER_ERROR));
    assert!(report.transcript_id.is_none());
    assert!(f.transcripts.is_empty().await);
    assert!(!report.transitions.contains(&SessionState::Draining));
}

#[tokio::test]
async fn invalid_first_frame_is_rejected_without_upstream_call() {
    let upstream = ScriptedUpstream::new(vec![terminal("done", None)]);
    let f = fixture(upstream.clone()).await;
    let sink = RecordingSink::default();

    let report = f
        .bridge
        .run(
            APP,
            open_socket(vec![ClientFrame::Text("{not json".into())]),
            sink.clone(),
        )
        .await;

    assert_eq!(report.outcome, SessionOutcome::Rejected);
    assert!(!report.upstream_opened);
    assert!(upstream.calls().is_empty());
    assert_eq!(f.issuer.issued.load(Ordering::SeqCst), 0);
    assert!(sink.results().is_empty());
    assert_eq!(sink.close_code(), Some(close_code::INVALID_PAYLOAD));
}

#[tokio::test]
async fn request_failing_validation_is_rejected() {
    let upstream = ScriptedUpstream::new(vec![terminal("done", None)]);
    let f = fixture(upstream.clone()).await;
    let sink = RecordingSink::default();
    let request = serde_json::json!({
        "modelVendor": "OPEN_AI",
        "modelType": "gpt-4",
        "providerPromptMessages": []
    });

    let report = f
        .bridge
        .run(
            APP,
            open_socket(vec![ClientFrame::Text(request.to_string())]),
            sink.clone(),
        )
        .await;

    assert_eq!(report.outcome, SessionOutcome::Rejected);
    assert!(upstream.calls().is_empty());
    assert_eq!(sink.close_code(), Some(close_code::INVALID_PAYLOAD));
}

#[tokio::test]
async fn binary_first_frame_is_rejected() {
    let upstream = ScriptedUpstream::new(vec![terminal("done", None)]);
    let f = fixture(upstream.clone()).await;
    let sink = RecordingSink::default();

    let report = f
        .bridge
        .run(
            APP,
            open_socket(vec![ClientFrame::Binary(b"{}".to_vec())]),
            sink.clone(),
        )
        .await;

    assert_eq!(report.outcome, SessionOutcome::Rejected);
    assert!(upstream.calls().is_empty());
    assert_eq!(sink.close_code(), Some(close_code::INVALID_PAYLOAD));
}

#[tokio::test]
async fn unknown_config_id_is_rejected() {
    let upstream = ScriptedUpstream::new(vec![terminal("done", None)]);
    let f = fixture(upstream.clone()).await;
    let sink = RecordingSink::default();

    let report = f
        .bridge
        .run(
            APP,
            open_socket(vec![ClientFrame::Text(run_request(Some("pc-missing")))]),
            sink.clone(),
        )
        .await;

    assert_eq!(report.outcome, SessionOutcome::Rejected);
    assert!(upstream.calls().is_empty());
    assert_eq!(f.issuer.issued.load(Ordering::SeqCst), 0);
    assert_eq!(sink.close_code(), Some(close_code::INVALID_PAYLOAD));
}

#[tokio::test]
async fn write_failure_ends_session_and_cancels_upstream() {
    let upstream = HangingUpstream::new(vec![content("hello")]);
    let f = fixture(upstream.clone()).await;
    let sink = RecordingSink {
        fail_writes: true,
        ..RecordingSink::default()
    };

    let report = f
        .bridge
        .run(
            APP,
            open_socket(vec![ClientFrame::Text(run_request(Some(&f.config_id)))]),
            sink,
        )
        .await;

    assert_eq!(report.outcome, SessionOutcome::WriteFailed);
    assert_eq!(report.frames_sent, 0);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(upstream.was_dropped());
}

// ============================================================================
// Keep-alive and client close
// ============================================================================

#[tokio::test(start_paused = true)]
async fn idle_session_times_out() {
    let upstream = ScriptedUpstream::new(vec![]);
    let f = fixture(upstream.clone()).await;
    let bridge = f
        .bridge
        .with_config(SessionConfig::new().keepalive(Duration::from_secs(5)));
    let sink = RecordingSink::default();

    let started = tokio::time::Instant::now();
    let report = bridge.run(APP, open_socket(vec![]), sink.clone()).await;

    assert_eq!(report.outcome, SessionOutcome::TimedOut);
    assert!(started.elapsed() >= Duration::from_secs(5));
    assert_eq!(sink.close_code(), Some(close_code::KEEPALIVE_TIMEOUT));
    assert!(upstream.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stalled_stream_times_out_and_cancels_upstream() {
    let upstream = HangingUpstream::new(vec![content("hello")]);
    let f = fixture(upstream.clone()).await;
    let bridge = f
        .bridge
        .with_config(SessionConfig::new().keepalive(Duration::from_secs(5)));
    let sink = RecordingSink::default();

    let report = bridge
        .run(
            APP,
            open_socket(vec![ClientFrame::Text(run_request(Some(&f.config_id)))]),
            sink.clone(),
        )
        .await;

    assert_eq!(report.outcome, SessionOutcome::TimedOut);
    assert_eq!(sink.results(), vec![TestResultFrame::content("hello")]);
    assert_eq!(sink.close_code(), Some(close_code::KEEPALIVE_TIMEOUT));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(upstream.was_dropped());
}

#[tokio::test(start_paused = true)]
async fn slow_client_times_out_while_upstream_is_still_producing() {
    let mut events: Vec<StreamEvent> = (0..10).map(|i| content(&format!("chunk-{i}"))).collect();
    events.push(terminal("done", Some("rec-1")));
    let upstream = ScriptedUpstream::new(events);
    let f = fixture(upstream).await;
    let bridge = f
        .bridge
        .with_config(SessionConfig::new().keepalive(Duration::from_secs(5)));
    let sink = RecordingSink {
        write_delay: Duration::from_secs(2),
        ..RecordingSink::default()
    };

    let started = tokio::time::Instant::now();
    let report = bridge
        .run(
            APP,
            open_socket(vec![ClientFrame::Text(run_request(Some(&f.config_id)))]),
            sink.clone(),
        )
        .await;

    assert_eq!(report.outcome, SessionOutcome::TimedOut);
    // Writes finishing at 2s and 4s fit the window; the one started at 4s
    // ends past it and nothing is relayed afterwards.
    assert_eq!(report.frames_sent, 3);
    assert!(started.elapsed() < Duration::from_secs(7));
    assert!(report.transcript_id.is_none());
    assert!(f.transcripts.is_empty().await);
    assert!(sink.results().iter().all(|frame| !frame.is_terminal()));
    assert_eq!(sink.close_code(), Some(close_code::KEEPALIVE_TIMEOUT));
}

#[tokio::test(start_paused = true)]
async fn keepalive_frames_extend_the_deadline() {
    let upstream = ScriptedUpstream::new(vec![]);
    let f = fixture(upstream).await;
    let bridge = f
        .bridge
        .with_config(SessionConfig::new().keepalive(Duration::from_secs(1)));

    // A keep-alive every 600ms for three rounds, then silence.
    let pings = stream::unfold(0u32, |round| async move {
        if round == 3 {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(600)).await;
        let frame = if round % 2 == 0 {
            ClientFrame::Ping(Vec::new())
        } else {
            ClientFrame::Text("ping".into())
        };
        Some((frame, round + 1))
    })
    .chain(stream::pending());

    let started = tokio::time::Instant::now();
    let report = bridge
        .run(APP, Box::pin(pings), RecordingSink::default())
        .await;

    assert_eq!(report.outcome, SessionOutcome::TimedOut);
    assert!(started.elapsed() >= Duration::from_millis(2800));
}

#[tokio::test]
async fn text_ping_is_answered_with_pong() {
    let upstream = ScriptedUpstream::new(vec![]);
    let f = fixture(upstream).await;
    let sink = RecordingSink::default();

    let report = f
        .bridge
        .run(
            APP,
            stream::iter(vec![
                ClientFrame::Ping(b"proto".to_vec()),
                ClientFrame::Text("ping".into()),
                ClientFrame::Close,
            ]),
            sink.clone(),
        )
        .await;

    assert_eq!(report.outcome, SessionOutcome::ClientClosed);
    assert_eq!(sink.sent(), vec![Sent::Pong(b"ping".to_vec())]);
}

#[tokio::test]
async fn client_close_mid_stream_cancels_upstream() {
    let upstream = HangingUpstream::new(vec![content("hello")]);
    let f = fixture(upstream.clone()).await;
    let sink = RecordingSink::default();

    let first = ClientFrame::Text(run_request(Some(&f.config_id)));
    let inbound = stream::iter(vec![first]).chain(stream::once(async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        ClientFrame::Close
    }));
    let report = f.bridge.run(APP, Box::pin(inbound), sink.clone()).await;

    assert_eq!(report.outcome, SessionOutcome::ClientClosed);
    assert!(report.upstream_opened);
    assert_eq!(sink.results(), vec![TestResultFrame::content("hello")]);
    assert_eq!(sink.close_code(), None);
    assert!(f.transcripts.is_empty().await);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(upstream.was_dropped());
}

#[tokio::test]
async fn inbound_end_is_a_client_close() {
    let upstream = ScriptedUpstream::new(vec![]);
    let f = fixture(upstream).await;
    let sink = RecordingSink::default();

    let report = f
        .bridge
        .run(APP, stream::empty::<ClientFrame>(), sink.clone())
        .await;

    assert_eq!(report.outcome, SessionOutcome::ClientClosed);
    assert_eq!(
        report.transitions,
        vec![SessionState::Idle, SessionState::Open, SessionState::Closed]
    );
    assert!(sink.sent().is_empty());
}

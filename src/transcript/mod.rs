//! Transcript recording.
//!
//! A transcript is written once per completed prompt-test session whose
//! terminal event referenced a backend request record. Sessions that fail
//! or disconnect first never produce one.

mod memory;

pub use memory::MemoryTranscriptStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::types::{NewTranscript, Transcript};
use crate::{HuginnError, Result, telemetry};

/// Durable transcript storage.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    async fn insert(&self, transcript: Transcript) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<Transcript>>;

    /// Transcripts of one application, newest first.
    async fn list(&self, application_id: &str) -> Result<Vec<Transcript>>;
}

/// Persists completed runs and hands back the transcript id.
#[derive(Clone)]
pub struct TranscriptRecorder {
    store: Arc<dyn TranscriptStore>,
}

impl TranscriptRecorder {
    pub fn new(store: Arc<dyn TranscriptStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn TranscriptStore> {
        &self.store
    }

    /// Record one completed run.
    pub async fn record(&self, new: NewTranscript) -> Result<String> {
        if new.backend_request_id.is_empty() {
            return Err(HuginnError::InvalidInput(
                "transcript requires a backend request id".into(),
            ));
        }

        let transcript = Transcript {
            id: Uuid::now_v7().to_string(),
            application_id: new.application_id,
            prompt_config_id: new.prompt_config_id,
            session_name: new.session_name,
            variable_bindings: new.variable_bindings,
            response_text: new.response_text,
            backend_request_id: new.backend_request_id,
            created_at: Utc::now(),
        };
        let id = transcript.id.clone();

        match self.store.insert(transcript).await {
            Ok(()) => {
                metrics::counter!(telemetry::TRANSCRIPTS_RECORDED_TOTAL, "status" => "ok")
                    .increment(1);
                tracing::debug!(transcript_id = %id, "recorded transcript");
                Ok(id)
            }
            Err(e) => {
                metrics::counter!(telemetry::TRANSCRIPTS_RECORDED_TOTAL, "status" => "error")
                    .increment(1);
                Err(e)
            }
        }
    }
}

//! Recorded prompt test transcripts

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable record of one completed prompt-test session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub id: String,
    pub application_id: String,
    pub prompt_config_id: String,
    pub session_name: String,
    pub variable_bindings: BTreeMap<String, String>,
    pub response_text: String,
    /// Id of the request record persisted by the backend.
    pub backend_request_id: String,
    pub created_at: DateTime<Utc>,
}

/// Input to [`TranscriptRecorder::record`](crate::transcript::TranscriptRecorder::record).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTranscript {
    pub application_id: String,
    pub prompt_config_id: String,
    pub session_name: String,
    pub variable_bindings: BTreeMap<String, String>,
    pub response_text: String,
    pub backend_request_id: String,
}

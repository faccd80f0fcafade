//! Outbound frames written to the prompt-test client.

use serde::{Deserialize, Serialize};

/// Finish reason carried by the terminal frame of a failed run.
pub const ERROR_FINISH_REASON: &str = "error";

/// JSON payload of every outbound text frame.
///
/// Progress frames carry only `content`. The terminal frame carries
/// `finishReason` and, when a transcript was recorded, `transcriptId`.
/// A failed run ends with `errorMessage` and `finishReason = "error"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResultFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_id: Option<String>,
}

impl TestResultFrame {
    /// A progress frame carrying one chunk of generated text.
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            ..Self::default()
        }
    }

    /// The terminal frame of a completed run.
    pub fn terminal(finish_reason: impl Into<String>, transcript_id: Option<String>) -> Self {
        Self {
            finish_reason: Some(finish_reason.into()),
            transcript_id,
            ..Self::default()
        }
    }

    /// The terminal frame of a failed run.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            finish_reason: Some(ERROR_FINISH_REASON.to_string()),
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Whether this is the last frame of a run.
    pub fn is_terminal(&self) -> bool {
        self.finish_reason.is_some()
    }
}

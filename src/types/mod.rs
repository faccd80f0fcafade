//! Public types for the Huginn API.

mod event;
mod frame;
mod prompt;
mod test_run;
mod transcript;

pub use event::{EventStream, StreamEvent, UpstreamChunk};
pub use frame::{ERROR_FINISH_REASON, TestResultFrame};
pub use prompt::{NewPromptConfig, PromptConfig, PromptConfigUpdate};
pub use test_run::{TestRunRequest, UpstreamRequest};
pub use transcript::{NewTranscript, Transcript};

//! Process-lifetime service container.
//!
//! [`Huginn`] owns the shared collaborators (cache store, upstream channel,
//! credential issuer, repositories) and hands out the services built on
//! them. It is constructed once at startup through [`Huginn::builder`] and
//! torn down with [`Huginn::shutdown`].

mod builder;

pub use builder::HuginnBuilder;

use crate::bridge::StreamBridge;
use crate::cache::InvalidationPublisher;
use crate::configs::PromptConfigs;
use crate::transcript::TranscriptRecorder;

/// Shared services for one process.
#[derive(Clone)]
pub struct Huginn {
    configs: PromptConfigs,
    recorder: TranscriptRecorder,
    bridge: StreamBridge,
    invalidation: InvalidationPublisher,
}

impl Huginn {
    pub fn builder() -> HuginnBuilder {
        HuginnBuilder::new()
    }

    pub fn configs(&self) -> &PromptConfigs {
        &self.configs
    }

    pub fn transcripts(&self) -> &TranscriptRecorder {
        &self.recorder
    }

    pub fn bridge(&self) -> &StreamBridge {
        &self.bridge
    }

    pub fn invalidation(&self) -> &InvalidationPublisher {
        &self.invalidation
    }

    /// Drain pending cache invalidations. Sessions still running keep
    /// their own upstream calls until they close.
    pub async fn shutdown(&self) {
        self.invalidation.shutdown().await;
        tracing::info!("huginn shut down");
    }
}

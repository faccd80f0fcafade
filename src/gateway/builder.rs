//! Builder for the process-lifetime service container

use std::sync::Arc;
use std::time::Duration;

use super::Huginn;
use crate::bridge::{SessionConfig, StreamBridge};
use crate::cache::{CacheStore, InvalidationPublisher, MemoryStore, ReadThroughCache};
use crate::configs::{
    DEFAULT_REQUEST_CONFIG_TTL, MemoryPromptConfigs, PromptConfigRepository, PromptConfigs,
};
use crate::transcript::{MemoryTranscriptStore, TranscriptRecorder, TranscriptStore};
use crate::upstream::{CredentialIssuer, UpstreamClient};
use crate::{HuginnError, Result};

/// Builder for [`Huginn`].
///
/// The upstream client and credential issuer are required. Storage
/// defaults to in-memory implementations.
pub struct HuginnBuilder {
    cache_store: Option<Arc<dyn CacheStore>>,
    prompt_configs: Option<Arc<dyn PromptConfigRepository>>,
    transcripts: Option<Arc<dyn TranscriptStore>>,
    upstream: Option<Arc<dyn UpstreamClient>>,
    credentials: Option<Arc<dyn CredentialIssuer>>,
    session: SessionConfig,
    request_config_ttl: Duration,
}

impl HuginnBuilder {
    pub fn new() -> Self {
        Self {
            cache_store: None,
            prompt_configs: None,
            transcripts: None,
            upstream: None,
            credentials: None,
            session: SessionConfig::default(),
            request_config_ttl: DEFAULT_REQUEST_CONFIG_TTL,
        }
    }

    /// Cache store shared by reads and invalidation (default: [`MemoryStore`]).
    pub fn cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache_store = Some(store);
        self
    }

    /// Authoritative prompt config storage (default: in-memory).
    pub fn prompt_configs(mut self, repository: Arc<dyn PromptConfigRepository>) -> Self {
        self.prompt_configs = Some(repository);
        self
    }

    /// Transcript storage (default: in-memory).
    pub fn transcripts(mut self, store: Arc<dyn TranscriptStore>) -> Self {
        self.transcripts = Some(store);
        self
    }

    pub fn upstream(mut self, client: Arc<dyn UpstreamClient>) -> Self {
        self.upstream = Some(client);
        self
    }

    pub fn credentials(mut self, issuer: Arc<dyn CredentialIssuer>) -> Self {
        self.credentials = Some(issuer);
        self
    }

    pub fn session(mut self, config: SessionConfig) -> Self {
        self.session = config;
        self
    }

    /// TTL of cached request configurations (default: 30 minutes).
    pub fn request_config_ttl(mut self, ttl: Duration) -> Self {
        self.request_config_ttl = ttl;
        self
    }

    /// Build the container and start the invalidation worker.
    ///
    /// # Panics
    ///
    /// Requires a tokio runtime context.
    pub fn build(self) -> Result<Huginn> {
        let upstream = self
            .upstream
            .ok_or_else(|| HuginnError::Configuration("no upstream client configured".into()))?;
        let credentials = self
            .credentials
            .ok_or_else(|| HuginnError::Configuration("no credential issuer configured".into()))?;

        let store = self
            .cache_store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let repository = self
            .prompt_configs
            .unwrap_or_else(|| Arc::new(MemoryPromptConfigs::new()));
        let transcripts = self
            .transcripts
            .unwrap_or_else(|| Arc::new(MemoryTranscriptStore::new()));

        let invalidation = InvalidationPublisher::spawn(Arc::clone(&store));
        let cache = ReadThroughCache::new(store);
        let configs = PromptConfigs::new(repository, cache, invalidation.clone())
            .request_config_ttl(self.request_config_ttl);
        let recorder = TranscriptRecorder::new(transcripts);
        let bridge = StreamBridge::new(upstream, credentials, configs.clone(), recorder.clone())
            .with_config(self.session);

        Ok(Huginn {
            configs,
            recorder,
            bridge,
            invalidation,
        })
    }
}

impl Default for HuginnBuilder {
    fn default() -> Self {
        Self::new()
    }
}

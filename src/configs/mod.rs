//! Prompt configurations with a cached read path.
//!
//! [`PromptConfigs`] sits between callers and a [`PromptConfigRepository`].
//! Reads go through the [`ReadThroughCache`]; every mutation computes its
//! [`InvalidationSet`] and hands it to the [`InvalidationPublisher`] without
//! waiting for the deletion.

mod memory;
mod template;

pub use memory::MemoryPromptConfigs;
pub use template::expected_template_variables;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

use crate::cache::{CacheKey, InvalidationPublisher, InvalidationSet, ReadThroughCache};
use crate::types::{NewPromptConfig, PromptConfig, PromptConfigUpdate, TestRunRequest};
use crate::{HuginnError, Result};

/// Default TTL of cached request configurations.
pub const DEFAULT_REQUEST_CONFIG_TTL: Duration = Duration::from_secs(30 * 60);

/// Authoritative prompt config storage.
#[async_trait]
pub trait PromptConfigRepository: Send + Sync {
    async fn find(
        &self,
        application_id: &str,
        prompt_config_id: &str,
    ) -> Result<Option<PromptConfig>>;

    async fn find_default(&self, application_id: &str) -> Result<Option<PromptConfig>>;

    async fn list(&self, application_id: &str) -> Result<Vec<PromptConfig>>;

    /// Insert a config. The first non-test config of an application
    /// becomes its default.
    async fn create(&self, new: NewPromptConfig) -> Result<PromptConfig>;

    /// Make `prompt_config_id` the default, returning the previous default.
    async fn set_default(
        &self,
        application_id: &str,
        prompt_config_id: &str,
    ) -> Result<Option<String>>;

    /// Replace a stored config.
    async fn update(&self, config: PromptConfig) -> Result<PromptConfig>;

    async fn delete(&self, application_id: &str, prompt_config_id: &str) -> Result<()>;
}

/// Prompt config service.
#[derive(Clone)]
pub struct PromptConfigs {
    repository: Arc<dyn PromptConfigRepository>,
    cache: ReadThroughCache,
    invalidation: InvalidationPublisher,
    request_config_ttl: Duration,
}

impl PromptConfigs {
    pub fn new(
        repository: Arc<dyn PromptConfigRepository>,
        cache: ReadThroughCache,
        invalidation: InvalidationPublisher,
    ) -> Self {
        Self {
            repository,
            cache,
            invalidation,
            request_config_ttl: DEFAULT_REQUEST_CONFIG_TTL,
        }
    }

    /// Set the TTL of cached request configurations.
    pub fn request_config_ttl(mut self, ttl: Duration) -> Self {
        self.request_config_ttl = ttl;
        self
    }

    pub fn repository(&self) -> &Arc<dyn PromptConfigRepository> {
        &self.repository
    }

    /// Resolve the config used to serve a request: the given one, or the
    /// application default. Missing configs are never cached.
    pub async fn request_configuration(
        &self,
        application_id: &str,
        prompt_config_id: Option<&str>,
    ) -> Result<PromptConfig> {
        let repository = Arc::clone(&self.repository);
        match prompt_config_id {
            Some(id) => {
                let key = CacheKey::prompt_config(application_id, id);
                self.cache
                    .get_or_load(&key, self.request_config_ttl, || async move {
                        repository
                            .find(application_id, id)
                            .await?
                            .ok_or_else(|| HuginnError::NotFound(format!("prompt config {id}")))
                    })
                    .await
            }
            None => {
                let key = CacheKey::application(application_id);
                self.cache
                    .get_or_load(&key, self.request_config_ttl, || async move {
                        repository.find_default(application_id).await?.ok_or_else(|| {
                            HuginnError::NotFound(format!(
                                "default prompt config of application {application_id}"
                            ))
                        })
                    })
                    .await
            }
        }
    }

    pub async fn list(&self, application_id: &str) -> Result<Vec<PromptConfig>> {
        self.repository.list(application_id).await
    }

    pub async fn create(&self, mut new: NewPromptConfig) -> Result<PromptConfig> {
        new.name = new.name.trim().to_string();
        new.expected_template_variables =
            expected_template_variables(&new.provider_prompt_messages);
        self.repository.create(new).await
    }

    /// Make `prompt_config_id` the application default.
    pub async fn set_default(&self, application_id: &str, prompt_config_id: &str) -> Result<()> {
        let current = self.repository.find_default(application_id).await?;
        if current.as_ref().is_some_and(|c| c.id == prompt_config_id) {
            return Err(HuginnError::InvalidInput(format!(
                "prompt config {prompt_config_id} is already the default"
            )));
        }

        let previous = self
            .repository
            .set_default(application_id, prompt_config_id)
            .await?;

        let set = match previous {
            Some(old) => InvalidationSet::default_changed(application_id, &old, prompt_config_id),
            None => InvalidationSet::prompt_config_updated(application_id, prompt_config_id, true),
        };
        self.invalidation.invalidate(set);
        Ok(())
    }

    pub async fn update(
        &self,
        application_id: &str,
        prompt_config_id: &str,
        patch: PromptConfigUpdate,
    ) -> Result<PromptConfig> {
        let mut config = self
            .repository
            .find(application_id, prompt_config_id)
            .await?
            .ok_or_else(|| HuginnError::NotFound(format!("prompt config {prompt_config_id}")))?;

        let messages_changed = patch.provider_prompt_messages.is_some();
        patch.apply(&mut config);
        if messages_changed {
            config.expected_template_variables =
                expected_template_variables(&config.provider_prompt_messages);
        }

        let updated = self.repository.update(config).await?;
        self.invalidation.invalidate(InvalidationSet::prompt_config_updated(
            application_id,
            prompt_config_id,
            updated.is_default,
        ));
        Ok(updated)
    }

    /// Delete a config. The default config cannot be deleted.
    pub async fn delete(&self, application_id: &str, prompt_config_id: &str) -> Result<()> {
        let config = self
            .repository
            .find(application_id, prompt_config_id)
            .await?
            .ok_or_else(|| HuginnError::NotFound(format!("prompt config {prompt_config_id}")))?;
        if config.is_default {
            return Err(HuginnError::InvalidInput(
                "cannot delete the default prompt config".into(),
            ));
        }

        self.repository
            .delete(application_id, prompt_config_id)
            .await?;
        self.invalidation
            .invalidate(InvalidationSet::prompt_config_deleted(application_id, prompt_config_id));
        Ok(())
    }

    /// Create the test-only config used when a prompt test names none.
    pub async fn create_provisional(
        &self,
        application_id: &str,
        request: &TestRunRequest,
    ) -> Result<PromptConfig> {
        let config = self
            .create(NewPromptConfig {
                application_id: application_id.to_string(),
                name: provisional_name(),
                model_vendor: request.model_vendor.clone(),
                model_type: request.model_type.clone(),
                model_parameters: request.model_parameters.clone(),
                provider_prompt_messages: request.provider_prompt_messages.clone(),
                expected_template_variables: Vec::new(),
                is_test: true,
            })
            .await?;
        tracing::debug!(prompt_config_id = %config.id, "created provisional prompt config");
        Ok(config)
    }

    /// Prompt config id for a test run, creating a provisional config when
    /// the request does not reference one.
    ///
    /// A referenced config is looked up through the cache; an unknown id is
    /// [`HuginnError::NotFound`].
    pub async fn resolve_test_config(
        &self,
        application_id: &str,
        request: &TestRunRequest,
    ) -> Result<String> {
        match request.prompt_config_id.as_deref() {
            Some(id) => Ok(self.request_configuration(application_id, Some(id)).await?.id),
            None => Ok(self.create_provisional(application_id, request).await?.id),
        }
    }
}

fn provisional_name() -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "test config - {} - {}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        &random[..16]
    )
}

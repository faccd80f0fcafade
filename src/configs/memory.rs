use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::PromptConfigRepository;
use crate::types::{NewPromptConfig, PromptConfig};
use crate::{HuginnError, Result};

/// In-memory [`PromptConfigRepository`].
#[derive(Default)]
pub struct MemoryPromptConfigs {
    // application id -> configs in creation order
    configs: RwLock<HashMap<String, Vec<PromptConfig>>>,
}

impl MemoryPromptConfigs {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(prompt_config_id: &str) -> HuginnError {
    HuginnError::NotFound(format!("prompt config {prompt_config_id}"))
}

#[async_trait]
impl PromptConfigRepository for MemoryPromptConfigs {
    async fn find(
        &self,
        application_id: &str,
        prompt_config_id: &str,
    ) -> Result<Option<PromptConfig>> {
        let configs = self.configs.read().await;
        Ok(configs
            .get(application_id)
            .and_then(|list| list.iter().find(|c| c.id == prompt_config_id))
            .cloned())
    }

    async fn find_default(&self, application_id: &str) -> Result<Option<PromptConfig>> {
        let configs = self.configs.read().await;
        Ok(configs
            .get(application_id)
            .and_then(|list| list.iter().find(|c| c.is_default))
            .cloned())
    }

    async fn list(&self, application_id: &str) -> Result<Vec<PromptConfig>> {
        let configs = self.configs.read().await;
        Ok(configs.get(application_id).cloned().unwrap_or_default())
    }

    async fn create(&self, new: NewPromptConfig) -> Result<PromptConfig> {
        let mut configs = self.configs.write().await;
        let list = configs.entry(new.application_id.clone()).or_default();
        let has_default = list.iter().any(|c| c.is_default);

        let config = PromptConfig {
            id: Uuid::now_v7().to_string(),
            application_id: new.application_id,
            name: new.name,
            model_vendor: new.model_vendor,
            model_type: new.model_type,
            model_parameters: new.model_parameters,
            provider_prompt_messages: new.provider_prompt_messages,
            expected_template_variables: new.expected_template_variables,
            is_default: !new.is_test && !has_default,
            is_test: new.is_test,
        };
        list.push(config.clone());
        Ok(config)
    }

    async fn set_default(
        &self,
        application_id: &str,
        prompt_config_id: &str,
    ) -> Result<Option<String>> {
        let mut configs = self.configs.write().await;
        let list = configs
            .get_mut(application_id)
            .ok_or_else(|| not_found(prompt_config_id))?;
        if !list.iter().any(|c| c.id == prompt_config_id) {
            return Err(not_found(prompt_config_id));
        }

        let mut previous = None;
        for config in list.iter_mut() {
            if config.is_default && config.id != prompt_config_id {
                previous = Some(config.id.clone());
            }
            config.is_default = config.id == prompt_config_id;
        }
        Ok(previous)
    }

    async fn update(&self, config: PromptConfig) -> Result<PromptConfig> {
        let mut configs = self.configs.write().await;
        let slot = configs
            .get_mut(&config.application_id)
            .and_then(|list| list.iter_mut().find(|c| c.id == config.id))
            .ok_or_else(|| not_found(&config.id))?;
        *slot = config.clone();
        Ok(config)
    }

    async fn delete(&self, application_id: &str, prompt_config_id: &str) -> Result<()> {
        let mut configs = self.configs.write().await;
        let list = configs
            .get_mut(application_id)
            .ok_or_else(|| not_found(prompt_config_id))?;
        let before = list.len();
        list.retain(|c| c.id != prompt_config_id);
        if list.len() == before {
            return Err(not_found(prompt_config_id));
        }
        Ok(())
    }
}

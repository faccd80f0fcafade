//! Prompt configuration types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored prompt configuration: which model to call and with which
/// provider-specific prompt messages.
///
/// This is also the value cached under the application-level and
/// prompt-config-level [`CacheKey`](crate::cache::CacheKey)s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptConfig {
    pub id: String,
    pub application_id: String,
    pub name: String,
    pub model_vendor: String,
    pub model_type: String,
    #[serde(default)]
    pub model_parameters: Value,
    #[serde(default)]
    pub provider_prompt_messages: Value,
    #[serde(default)]
    pub expected_template_variables: Vec<String>,
    pub is_default: bool,
    /// Provisional configs created for ad-hoc prompt tests.
    #[serde(default)]
    pub is_test: bool,
}

/// Fields for creating a prompt configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPromptConfig {
    pub application_id: String,
    pub name: String,
    pub model_vendor: String,
    pub model_type: String,
    pub model_parameters: Value,
    pub provider_prompt_messages: Value,
    pub expected_template_variables: Vec<String>,
    pub is_test: bool,
}

/// Partial update of a prompt configuration. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptConfigUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model_type: Option<String>,
    #[serde(default)]
    pub model_parameters: Option<Value>,
    #[serde(default)]
    pub provider_prompt_messages: Option<Value>,
}

impl PromptConfigUpdate {
    /// Apply this patch to `config` in place.
    pub fn apply(self, config: &mut PromptConfig) {
        if let Some(name) = self.name {
            config.name = name.trim().to_string();
        }
        if let Some(model_type) = self.model_type {
            config.model_type = model_type;
        }
        if let Some(parameters) = self.model_parameters {
            config.model_parameters = parameters;
        }
        if let Some(messages) = self.provider_prompt_messages {
            config.provider_prompt_messages = messages;
        }
    }
}

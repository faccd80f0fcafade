//! Prompt test run request types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{HuginnError, Result};

/// First data frame of a prompt-test session.
///
/// Either references a stored prompt configuration through
/// `promptConfigId`, or carries the provider payload inline and gets a
/// provisional configuration created for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRunRequest {
    /// Optional session name used for the recorded transcript.
    #[serde(default)]
    pub name: Option<String>,
    pub model_vendor: String,
    pub model_type: String,
    #[serde(default)]
    pub model_parameters: Value,
    pub provider_prompt_messages: Value,
    #[serde(default)]
    pub template_variables: BTreeMap<String, String>,
    #[serde(default)]
    pub prompt_config_id: Option<String>,
}

impl TestRunRequest {
    /// Parse and validate a raw text frame.
    pub fn from_frame(text: &str) -> Result<Self> {
        let request: Self = serde_json::from_str(text)?;
        request.validate()?;
        Ok(request)
    }

    /// Check the request shape before any upstream call is made.
    pub fn validate(&self) -> Result<()> {
        if self.model_vendor.trim().is_empty() {
            return Err(HuginnError::InvalidInput("modelVendor is required".into()));
        }
        if self.model_type.trim().is_empty() {
            return Err(HuginnError::InvalidInput("modelType is required".into()));
        }
        if !(self.model_parameters.is_null() || self.model_parameters.is_object()) {
            return Err(HuginnError::InvalidInput(
                "modelParameters must be an object".into(),
            ));
        }
        match self.provider_prompt_messages.as_array() {
            Some(messages) if !messages.is_empty() && messages.iter().all(Value::is_object) => {}
            _ => {
                return Err(HuginnError::InvalidInput(
                    "providerPromptMessages must be a non-empty array of objects".into(),
                ));
            }
        }
        if matches!(&self.prompt_config_id, Some(id) if id.trim().is_empty()) {
            return Err(HuginnError::InvalidInput(
                "promptConfigId must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Request sent on the upstream streaming call.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    pub application_id: String,
    pub prompt_config_id: String,
    pub model_vendor: String,
    pub model_type: String,
    pub model_parameters: Value,
    pub provider_prompt_messages: Value,
    pub template_variables: BTreeMap<String, String>,
}

impl UpstreamRequest {
    /// Build the upstream request for a validated test run.
    pub fn from_test_run(
        application_id: impl Into<String>,
        prompt_config_id: impl Into<String>,
        request: &TestRunRequest,
    ) -> Self {
        Self {
            application_id: application_id.into(),
            prompt_config_id: prompt_config_id.into(),
            model_vendor: request.model_vendor.clone(),
            model_type: request.model_type.clone(),
            model_parameters: request.model_parameters.clone(),
            provider_prompt_messages: request.provider_prompt_messages.clone(),
            template_variables: request.template_variables.clone(),
        }
    }
}

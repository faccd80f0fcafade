//! HTTP routes served by huginnd.
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | GET | `/health` | version and status |
//! | GET | `/v1/applications/:application_id/prompt-testing` | websocket prompt-test session |
//! | GET | `/v1/applications/:application_id/transcripts` | list transcripts |
//! | GET | `/v1/transcripts/:transcript_id` | fetch one transcript |
//! | GET, POST | `/v1/applications/:application_id/prompt-configs` | list / create prompt configs |
//! | PATCH, DELETE | `/v1/applications/:application_id/prompt-configs/:prompt_config_id` | update / delete |
//! | PATCH | `/v1/applications/:application_id/prompt-configs/:prompt_config_id/set-default` | make default |
//! | GET | `/v1/applications/:application_id/request-configuration` | cached config lookup |
//!
//! Authorization is not handled here; the application id comes from the path.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bridge::ws;
use crate::gateway::Huginn;
use crate::types::{NewPromptConfig, PromptConfig, PromptConfigUpdate, Transcript};
use crate::HuginnError;
use crate::version::BuildInfo;

/// Build the router over a shared [`Huginn`] container.
pub fn router(huginn: Huginn) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/v1/applications/:application_id/prompt-testing",
            get(prompt_testing),
        )
        .route(
            "/v1/applications/:application_id/transcripts",
            get(list_transcripts),
        )
        .route("/v1/transcripts/:transcript_id", get(get_transcript))
        .route(
            "/v1/applications/:application_id/prompt-configs",
            get(list_prompt_configs).post(create_prompt_config),
        )
        .route(
            "/v1/applications/:application_id/prompt-configs/:prompt_config_id",
            patch(update_prompt_config).delete(delete_prompt_config),
        )
        .route(
            "/v1/applications/:application_id/prompt-configs/:prompt_config_id/set-default",
            patch(set_default_prompt_config),
        )
        .route(
            "/v1/applications/:application_id/request-configuration",
            get(request_configuration),
        )
        .with_state(huginn)
}

/// JSON error response.
pub struct ApiError(HuginnError);

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl From<HuginnError> for ApiError {
    fn from(err: HuginnError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            HuginnError::NotFound(_) => StatusCode::NOT_FOUND,
            HuginnError::InvalidInput(_) | HuginnError::Json(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Serialize)]
struct Health {
    status: &'static str,
    version: String,
    build: BuildInfo,
}

async fn health() -> Json<Health> {
    let build = BuildInfo::current();
    Json(Health {
        status: "ok",
        version: build.render(),
        build,
    })
}

async fn prompt_testing(
    upgrade: WebSocketUpgrade,
    State(huginn): State<Huginn>,
    Path(application_id): Path<String>,
) -> Response {
    tracing::debug!(application_id = %application_id, "prompt testing upgrade requested");
    upgrade.on_upgrade(move |socket| async move {
        ws::serve(huginn.bridge(), &application_id, socket).await;
    })
}

async fn list_transcripts(
    State(huginn): State<Huginn>,
    Path(application_id): Path<String>,
) -> ApiResult<Json<Vec<Transcript>>> {
    let transcripts = huginn.transcripts().store().list(&application_id).await?;
    Ok(Json(transcripts))
}

async fn get_transcript(
    State(huginn): State<Huginn>,
    Path(transcript_id): Path<String>,
) -> ApiResult<Json<Transcript>> {
    huginn
        .transcripts()
        .store()
        .get(&transcript_id)
        .await?
        .map(Json)
        .ok_or_else(|| HuginnError::NotFound(format!("transcript {transcript_id}")).into())
}

async fn list_prompt_configs(
    State(huginn): State<Huginn>,
    Path(application_id): Path<String>,
) -> ApiResult<Json<Vec<PromptConfig>>> {
    Ok(Json(huginn.configs().list(&application_id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePromptConfigBody {
    name: String,
    model_vendor: String,
    model_type: String,
    #[serde(default)]
    model_parameters: Value,
    provider_prompt_messages: Value,
}

async fn create_prompt_config(
    State(huginn): State<Huginn>,
    Path(application_id): Path<String>,
    Json(body): Json<CreatePromptConfigBody>,
) -> ApiResult<(StatusCode, Json<PromptConfig>)> {
    if body.name.trim().is_empty() {
        return Err(HuginnError::InvalidInput("name is required".into()).into());
    }
    let config = huginn
        .configs()
        .create(NewPromptConfig {
            application_id,
            name: body.name,
            model_vendor: body.model_vendor,
            model_type: body.model_type,
            model_parameters: body.model_parameters,
            provider_prompt_messages: body.provider_prompt_messages,
            expected_template_variables: Vec::new(),
            is_test: false,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(config)))
}

async fn update_prompt_config(
    State(huginn): State<Huginn>,
    Path((application_id, prompt_config_id)): Path<(String, String)>,
    Json(patch): Json<PromptConfigUpdate>,
) -> ApiResult<Json<PromptConfig>> {
    let config = huginn
        .configs()
        .update(&application_id, &prompt_config_id, patch)
        .await?;
    Ok(Json(config))
}

async fn delete_prompt_config(
    State(huginn): State<Huginn>,
    Path((application_id, prompt_config_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    huginn
        .configs()
        .delete(&application_id, &prompt_config_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_default_prompt_config(
    State(huginn): State<Huginn>,
    Path((application_id, prompt_config_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    huginn
        .configs()
        .set_default(&application_id, &prompt_config_id)
        .await?;
    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestConfigurationQuery {
    prompt_config_id: Option<String>,
}

async fn request_configuration(
    State(huginn): State<Huginn>,
    Path(application_id): Path<String>,
    Query(query): Query<RequestConfigurationQuery>,
) -> ApiResult<Json<PromptConfig>> {
    let config = huginn
        .configs()
        .request_configuration(&application_id, query.prompt_config_id.as_deref())
        .await?;
    Ok(Json(config))
}

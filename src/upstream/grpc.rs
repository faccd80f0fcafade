//! gRPC client for the backend `PromptTestingService`.
//!
//! Message types are declared with prost derives; the call itself goes
//! through tonic's generic [`Grpc`] client so no generated stubs are needed.

use std::collections::HashMap;
use std::time::Duration;

use futures_util::{StreamExt, stream};
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::metadata::AsciiMetadataValue;
use tonic::transport::{Channel, Endpoint};

use super::{ChunkStream, SessionCredential, UpstreamClient, normalize};
use crate::types::{EventStream, UpstreamChunk, UpstreamRequest};
use crate::{HuginnError, Result};

const TEST_PROMPT_PATH: &str = "/prompt_testing.v1.PromptTestingService/TestPrompt";

/// Default timeout for establishing the upstream connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// `TestPrompt` request message.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PromptTestRequest {
    #[prost(string, tag = "1")]
    pub application_id: String,
    #[prost(string, tag = "2")]
    pub prompt_config_id: String,
    #[prost(string, tag = "3")]
    pub model_vendor: String,
    #[prost(string, tag = "4")]
    pub model_type: String,
    /// JSON-encoded model parameters.
    #[prost(bytes = "vec", tag = "5")]
    pub model_parameters: Vec<u8>,
    /// JSON-encoded provider prompt messages.
    #[prost(bytes = "vec", tag = "6")]
    pub provider_prompt_messages: Vec<u8>,
    #[prost(map = "string, string", tag = "7")]
    pub template_variables: HashMap<String, String>,
}

/// One streamed `TestPrompt` response message.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PromptTestResponse {
    #[prost(string, tag = "1")]
    pub content: String,
    #[prost(string, optional, tag = "2")]
    pub finish_reason: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub prompt_request_record_id: Option<String>,
}

impl PromptTestRequest {
    fn from_request(request: &UpstreamRequest) -> Result<Self> {
        Ok(Self {
            application_id: request.application_id.clone(),
            prompt_config_id: request.prompt_config_id.clone(),
            model_vendor: request.model_vendor.clone(),
            model_type: request.model_type.clone(),
            model_parameters: serde_json::to_vec(&request.model_parameters)?,
            provider_prompt_messages: serde_json::to_vec(&request.provider_prompt_messages)?,
            template_variables: request
                .template_variables
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        })
    }
}

impl From<PromptTestResponse> for UpstreamChunk {
    fn from(response: PromptTestResponse) -> Self {
        UpstreamChunk {
            content: response.content,
            finish_reason: response.finish_reason,
            backend_request_id: response.prompt_request_record_id,
        }
    }
}

/// [`UpstreamClient`] over a tonic channel.
///
/// The channel is created once and shared by every session; it connects
/// lazily on first use and reconnects on its own.
#[derive(Clone)]
pub struct GrpcUpstream {
    channel: Channel,
}

impl GrpcUpstream {
    /// Create a client for `address` (e.g. `http://127.0.0.1:50051`).
    ///
    /// # Panics
    ///
    /// Requires a tokio runtime context.
    pub fn new(address: impl Into<String>, connect_timeout: Duration) -> Result<Self> {
        let address = address.into();
        let endpoint = Endpoint::from_shared(address.clone()).map_err(|e| {
            HuginnError::Configuration(format!("invalid upstream address {address}: {e}"))
        })?;
        let channel = endpoint.connect_timeout(connect_timeout).connect_lazy();
        tracing::info!(address = %address, "initialized prompt testing client");
        Ok(Self { channel })
    }

    async fn open(
        channel: Channel,
        request: UpstreamRequest,
        credential: SessionCredential,
    ) -> Result<ChunkStream> {
        let message = PromptTestRequest::from_request(&request)?;
        let mut grpc_request = tonic::Request::new(message);
        let bearer: AsciiMetadataValue = credential
            .bearer()
            .parse()
            .map_err(|e| HuginnError::Credential(format!("invalid credential header: {e}")))?;
        grpc_request.metadata_mut().insert("authorization", bearer);

        let mut grpc = Grpc::new(channel);
        grpc.ready()
            .await
            .map_err(|e| HuginnError::Upstream(format!("upstream not ready: {e}")))?;

        let codec = ProstCodec::<PromptTestRequest, PromptTestResponse>::default();
        let response = grpc
            .server_streaming(grpc_request, PathAndQuery::from_static(TEST_PROMPT_PATH), codec)
            .await?;

        let chunks = response
            .into_inner()
            .map(|item| item.map(UpstreamChunk::from).map_err(stream_error));
        Ok(Box::pin(chunks))
    }
}

/// A status received after the call was established.
fn stream_error(status: tonic::Status) -> HuginnError {
    HuginnError::Stream(format!("{}: {}", status.code(), status.message()))
}

impl UpstreamClient for GrpcUpstream {
    fn stream(&self, request: UpstreamRequest, credential: SessionCredential) -> EventStream {
        let channel = self.channel.clone();
        let chunks = stream::once(async move {
            match Self::open(channel, request, credential).await {
                Ok(chunks) => chunks,
                Err(e) => {
                    tracing::error!(error = %e, "failed to open upstream stream");
                    Box::pin(stream::iter([Err(e)])) as ChunkStream
                }
            }
        })
        .flatten();
        normalize(Box::pin(chunks))
    }
}

use super::ImageGenerationService;
use crate::models::{GenerationRequest, GenerationResponse};
use crate::{Error, Result};
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_bedrockruntime::config::Region;
use aws_sdk_bedrockruntime::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_bedrockruntime::operation::invoke_model::InvokeModelError;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::Client as BedrockRuntimeClient;

const APPLICATION_JSON: &str = "application/json";

/// Bedrock Runtime client for on-demand `InvokeModel` calls.
pub struct BedrockClient {
    client: BedrockRuntimeClient,
}

impl BedrockClient {
    /// Build a client for `region` using the default AWS credential chain.
    ///
    /// SDK-level retries are turned off; a failed call surfaces immediately.
    pub async fn new(region: String) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region))
            .retry_config(RetryConfig::disabled())
            .load()
            .await;

        Self::from_sdk_config(&config)
    }

    pub fn from_sdk_config(config: &SdkConfig) -> Self {
        Self {
            client: BedrockRuntimeClient::new(config),
        }
    }
}

/// Prefer the service's own message (e.g. a ValidationException's text) over
/// the full SDK error chain.
fn client_error_message(err: &SdkError<InvokeModelError>) -> String {
    err.as_service_error()
        .and_then(|e| e.message())
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(err).to_string())
}

#[async_trait]
impl ImageGenerationService for BedrockClient {
    async fn invoke(
        &self,
        model_id: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse> {
        let body = serde_json::to_vec(request)?;
        tracing::debug!(
            "Sending {} byte request body to Bedrock model {}",
            body.len(),
            model_id
        );

        let output = self
            .client
            .invoke_model()
            .model_id(model_id)
            .accept(APPLICATION_JSON)
            .content_type(APPLICATION_JSON)
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|e| {
                let message = client_error_message(&e);
                tracing::error!("A client error occurred: {}", message);
                Error::ServiceClient(message)
            })?;

        serde_json::from_slice(output.body().as_ref()).map_err(|e| {
            tracing::error!("Failed to parse Bedrock response: {}", e);
            Error::InvalidResponse(format!("Failed to parse Bedrock response: {}", e))
        })
    }
}

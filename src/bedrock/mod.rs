//! Amazon Bedrock integration for Titan Image Generator
//!
//! Abstracts the model invocation behind [`ImageGenerationService`] so the
//! request orchestration can run against a mock in tests.

pub mod client;
pub mod mock;

pub use client::BedrockClient;
pub use mock::MockGenerationClient;

use crate::models::{GenerationRequest, GenerationResponse};
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    /// Invoke `model_id` with `request` and return the parsed response body.
    ///
    /// A response carrying a non-null `error` is still `Ok` here; callers
    /// decide what to do with it.
    async fn invoke(
        &self,
        model_id: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse>;
}

//! Request orchestration for background removal.

use crate::bedrock::{BedrockClient, ImageGenerationService};
use crate::image::{EncodedPayload, ImagePreprocessor, ImageSource};
use crate::models::{Config, GenerationRequest, GenerationResponse};
use crate::{Error, Result};
use base64::Engine as _;
use std::path::Path;
use tracing::info;

/// Input handed to [`BackgroundRemover::run`].
///
/// Owned so the image can move onto a blocking worker thread.
#[derive(Debug, Clone)]
pub enum OwnedImageSource {
    Path(std::path::PathBuf),
    Bytes(Vec<u8>),
}

impl OwnedImageSource {
    fn as_source(&self) -> ImageSource<'_> {
        match self {
            OwnedImageSource::Path(path) => ImageSource::Path(path),
            OwnedImageSource::Bytes(bytes) => ImageSource::Bytes(bytes),
        }
    }
}

impl From<&Path> for OwnedImageSource {
    fn from(path: &Path) -> Self {
        OwnedImageSource::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for OwnedImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        OwnedImageSource::Bytes(bytes)
    }
}

/// Prepares images and sends them to the model for background removal.
pub struct BackgroundRemover {
    service: Box<dyn ImageGenerationService>,
    model_id: String,
    preprocessor: ImagePreprocessor,
}

impl BackgroundRemover {
    /// Build a remover around any generation service.
    ///
    /// Tests and local harnesses use this to inject
    /// [`MockGenerationClient`](crate::bedrock::MockGenerationClient).
    pub fn with_service(
        service: Box<dyn ImageGenerationService>,
        model_id: String,
        preprocessor: ImagePreprocessor,
    ) -> Self {
        Self {
            service,
            model_id,
            preprocessor,
        }
    }

    /// Construct a remover backed by Bedrock, using `config` for the region,
    /// model and size limit.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let preprocessor = ImagePreprocessor::new(config.max_dimension)?;
        info!(
            "Bedrock region: {} (model: {})",
            config.region, config.model_id
        );
        let client = BedrockClient::new(config.region.clone()).await;

        Ok(Self::with_service(
            Box::new(client),
            config.model_id.clone(),
            preprocessor,
        ))
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Prepare `source` and remove its background, returning the model's
    /// image bytes.
    pub async fn run(&self, source: impl Into<OwnedImageSource>) -> Result<Vec<u8>> {
        let source = source.into();
        let preprocessor = self.preprocessor;

        let payload = tokio::task::spawn_blocking(move || preprocessor.prepare(source.as_source()))
            .await
            .map_err(|e| Error::Invariant(format!("Image preprocessing task join error: {}", e)))??;

        self.remove_background(&payload).await
    }

    /// Send an already-encoded image to the model.
    pub async fn remove_background(&self, payload: &EncodedPayload) -> Result<Vec<u8>> {
        info!(
            "Generating image with Amazon Titan Image Generator V2 model {}",
            self.model_id
        );

        let request = GenerationRequest::background_removal(payload);
        let response = self.service.invoke(&self.model_id, &request).await?;
        let image_bytes = decode_response(response)?;

        info!(
            "Successfully generated image with Amazon Titan Image Generator V2 model {}",
            self.model_id
        );
        Ok(image_bytes)
    }
}

/// A non-null `error` wins over any images in the same response.
fn decode_response(response: GenerationResponse) -> Result<Vec<u8>> {
    if let Some(message) = response.error {
        tracing::error!("Image generation error: {}", message);
        return Err(Error::Generation { message });
    }

    let image = response.images.first().ok_or_else(|| {
        Error::InvalidResponse("No image data in response".to_string())
    })?;

    base64::engine::general_purpose::STANDARD
        .decode(image)
        .map_err(|e| Error::InvalidResponse(format!("Failed to decode base64 image: {}", e)))
}

//! Data models and structures
//!
//! Defines the Titan Image Generator request/response payloads and the
//! runtime configuration.

use crate::image::{EncodedPayload, DEFAULT_MAX_DIMENSION};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL_ID: &str = "amazon.titan-image-generator-v2:0";
pub const DEFAULT_REGION: &str = "us-west-2";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    BackgroundRemoval,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackgroundRemovalParams {
    /// Base64-encoded PNG.
    pub image: String,
}

// Titan Image Generator request/response models
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub task_type: TaskType,
    pub background_removal_params: BackgroundRemovalParams,
}

impl GenerationRequest {
    pub fn background_removal(payload: &EncodedPayload) -> Self {
        Self {
            task_type: TaskType::BackgroundRemoval,
            background_removal_params: BackgroundRemovalParams {
                image: payload.as_str().to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationResponse {
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl GenerationResponse {
    pub fn success(image_b64: String) -> Self {
        Self {
            images: vec![image_b64],
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            images: Vec::new(),
            error: Some(message.into()),
        }
    }
}

// Configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub region: String,
    pub model_id: String,
    pub max_dimension: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_dimension = match lookup("MAX_IMAGE_DIMENSION") {
            Some(raw) => parse_max_dimension(&raw)?,
            None => DEFAULT_MAX_DIMENSION,
        };

        Ok(Self {
            region: lookup("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            model_id: lookup("BEDROCK_MODEL_ID").unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
            max_dimension,
        })
    }
}

pub fn parse_max_dimension(raw: &str) -> crate::Result<u32> {
    match raw.trim().parse::<u32>() {
        Ok(0) => Err(crate::Error::Config(
            "MAX_IMAGE_DIMENSION must be greater than zero".to_string(),
        )),
        Ok(value) => Ok(value),
        Err(e) => Err(crate::Error::Config(format!(
            "Invalid MAX_IMAGE_DIMENSION '{}': {}",
            raw, e
        ))),
    }
}

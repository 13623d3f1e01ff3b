//! Error handling and custom error types
//!
//! Provides unified error handling across the crate using thiserror.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to decode input image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Failed to encode image as PNG: {0}")]
    Encode(#[source] image::ImageError),

    /// The model answered but reported an error of its own.
    #[error("Image generation error: {message}")]
    Generation { message: String },

    #[error("A client error occurred: {0}")]
    ServiceClient(String),

    #[error("Invalid response from image generation service: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invariant violation: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, Error>;

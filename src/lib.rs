//! Background removal for images via Amazon Titan Image Generator V2
//!
//! Downsizes an input image to fit the model's limits, re-encodes it as PNG,
//! and asks the Bedrock-hosted model to strip its background.

pub mod app;
pub mod bedrock;
pub mod error;
pub mod image;
pub mod models;

pub use error::{Error, Result};

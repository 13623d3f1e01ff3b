//! Image preprocessing ahead of background removal
//!
//! Downsizes input images that exceed the model's maximum edge length and
//! re-encodes them as Base64 PNG for the JSON request body.

pub mod preprocess;

pub use preprocess::{prepare, target_dimensions, ImagePreprocessor, DEFAULT_MAX_DIMENSION};

use std::path::Path;

/// Where the input image comes from.
#[derive(Debug, Clone, Copy)]
pub enum ImageSource<'a> {
    Path(&'a Path),
    Bytes(&'a [u8]),
}

/// Base64 text of a PNG, plus the dimensions of the encoded raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    data: String,
    width: u32,
    height: u32,
}

impl EncodedPayload {
    pub fn new(data: String, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

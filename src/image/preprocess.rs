use super::{EncodedPayload, ImageSource};
use crate::{Error, Result};
use base64::Engine as _;
use image::imageops::FilterType;
use image::error::{LimitError, LimitErrorKind};
use image::{DynamicImage, GenericImageView, ImageDecoder, ImageError, ImageFormat, ImageReader};
use std::io::{BufRead, Cursor, Seek};

/// Longest edge accepted by Titan Image Generator V2 for background removal.
pub const DEFAULT_MAX_DIMENSION: u32 = 1408;

/// Largest decodable image, in pixels. Anything bigger is treated as a
/// decompression bomb.
pub const MAX_IMAGE_PIXELS: u64 = 178_956_970;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePreprocessor {
    max_dimension: u32,
}

impl ImagePreprocessor {
    pub fn new(max_dimension: u32) -> Result<Self> {
        if max_dimension == 0 {
            return Err(Error::Config(
                "Maximum image dimension must be greater than zero".to_string(),
            ));
        }
        Ok(Self { max_dimension })
    }

    /// Decode `source`, shrink it to fit within the maximum dimension, and
    /// return the Base64-encoded PNG.
    ///
    /// Blocking: run it on `spawn_blocking` from async code.
    pub fn prepare(&self, source: ImageSource<'_>) -> Result<EncodedPayload> {
        let img = self.fit(load(source)?);
        let png = encode_png(&img)?;

        tracing::debug!(
            "Encoded {}x{} PNG ({} bytes) for upload",
            img.width(),
            img.height(),
            png.len()
        );

        let data = base64::engine::general_purpose::STANDARD.encode(&png);
        Ok(EncodedPayload::new(data, img.width(), img.height()))
    }

    fn fit(&self, img: DynamicImage) -> DynamicImage {
        let (width, height) = img.dimensions();
        match target_dimensions(width, height, self.max_dimension) {
            Some((new_width, new_height)) => {
                tracing::info!(
                    "Resizing image from {}x{} to {}x{}",
                    width,
                    height,
                    new_width,
                    new_height
                );
                img.resize_exact(new_width, new_height, FilterType::Lanczos3)
            }
            None => img,
        }
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

/// Shorthand for `ImagePreprocessor::new(max_dimension)?.prepare(source)`.
pub fn prepare(source: ImageSource<'_>, max_dimension: u32) -> Result<EncodedPayload> {
    ImagePreprocessor::new(max_dimension)?.prepare(source)
}

/// Size the image must be resized to, or `None` if it already fits.
///
/// Both edges are scaled by `max_dimension / max(width, height)` and
/// truncated, so the longest edge lands exactly on `max_dimension`.
pub fn target_dimensions(width: u32, height: u32, max_dimension: u32) -> Option<(u32, u32)> {
    if width <= max_dimension && height <= max_dimension {
        return None;
    }

    let longest = u64::from(width.max(height));
    let scale = |edge: u32| -> u32 {
        let scaled = u64::from(edge) * u64::from(max_dimension) / longest;
        // scaled <= max_dimension, so this never truncates
        (scaled as u32).max(1)
    };

    Some((scale(width), scale(height)))
}

fn load(source: ImageSource<'_>) -> Result<DynamicImage> {
    match source {
        ImageSource::Path(path) => {
            // The reader owns the file handle; it is dropped when decode returns.
            decode(ImageReader::open(path)?.with_guessed_format()?)
        }
        ImageSource::Bytes(bytes) => {
            decode(ImageReader::new(Cursor::new(bytes)).with_guessed_format()?)
        }
    }
}

/// Decode without the crate's default 512 MiB allocation cap, which rejects
/// valid high-resolution photos. A pixel-count ceiling guards against
/// decompression bombs instead.
fn decode<R: BufRead + Seek>(mut reader: ImageReader<R>) -> Result<DynamicImage> {
    reader.no_limits();
    let decoder = reader.into_decoder().map_err(Error::Decode)?;

    let (width, height) = decoder.dimensions();
    check_pixel_budget(width, height)?;

    DynamicImage::from_decoder(decoder).map_err(Error::Decode)
}

fn check_pixel_budget(width: u32, height: u32) -> Result<()> {
    if u64::from(width) * u64::from(height) > MAX_IMAGE_PIXELS {
        tracing::error!(
            "Refusing to decode {}x{} image: more than {} pixels",
            width,
            height,
            MAX_IMAGE_PIXELS
        );
        return Err(Error::Decode(ImageError::Limits(LimitError::from_kind(
            LimitErrorKind::DimensionError,
        ))));
    }
    Ok(())
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();

    let written = match img {
        // PNG has no float sample type
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            DynamicImage::ImageRgba16(img.to_rgba16())
                .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        }
        _ => img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png),
    };
    written.map_err(Error::Encode)?;

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn create_test_image(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        });
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn decode_payload(payload: &EncodedPayload) -> (Vec<u8>, DynamicImage) {
        let png = base64::engine::general_purpose::STANDARD
            .decode(payload.as_str())
            .unwrap();
        let img = image::load_from_memory_with_format(&png, ImageFormat::Png).unwrap();
        (png, img)
    }

    #[test]
    fn test_target_dimensions_within_bounds() {
        assert_eq!(target_dimensions(500, 500, 1408), None);
        assert_eq!(target_dimensions(1408, 1408, 1408), None);
        assert_eq!(target_dimensions(1408, 1, 1408), None);
    }

    #[test]
    fn test_target_dimensions_landscape() {
        assert_eq!(target_dimensions(2000, 1000, 1408), Some((1408, 704)));
    }

    #[test]
    fn test_target_dimensions_portrait() {
        assert_eq!(target_dimensions(1000, 3000, 1408), Some((469, 1408)));
    }

    #[test]
    fn test_target_dimensions_just_over() {
        assert_eq!(target_dimensions(1409, 1409, 1408), Some((1408, 1408)));
        assert_eq!(target_dimensions(1409, 100, 1408), Some((1408, 99)));
    }

    #[test]
    fn test_target_dimensions_never_collapses_to_zero() {
        assert_eq!(target_dimensions(100_000, 1, 1408), Some((1408, 1)));
    }

    #[test]
    fn test_target_dimensions_preserves_aspect_ratio() {
        for &(w, h) in &[(4032, 3024), (3000, 2000), (1920, 1080), (1500, 7000)] {
            let (nw, nh) = target_dimensions(w, h, 1408).unwrap();
            assert_eq!(nw.max(nh), 1408);

            let longest = w.max(h) as f64;
            for (edge, resized) in [(w, nw), (h, nh)] {
                let exact = edge as f64 * 1408.0 / longest;
                let resized = resized as f64;
                assert!(
                    resized <= exact + 1e-9 && exact - resized < 1.0,
                    "{}x{} -> {}x{}",
                    w,
                    h,
                    nw,
                    nh
                );
            }
        }
    }

    #[test]
    fn test_prepare_downsizes_large_image() {
        let input = create_test_image(2000, 1000);

        let payload = prepare(ImageSource::Bytes(&input), 1408).unwrap();
        assert_eq!((payload.width(), payload.height()), (1408, 704));

        let (_, img) = decode_payload(&payload);
        assert_eq!(img.dimensions(), (1408, 704));
    }

    #[test]
    fn test_prepare_keeps_small_image() {
        let input = create_test_image(500, 500);

        let payload = ImagePreprocessor::default()
            .prepare(ImageSource::Bytes(&input))
            .unwrap();

        let (png, img) = decode_payload(&payload);
        assert_eq!(img.dimensions(), (500, 500));
        assert_eq!(&png[..4], &[0x89, 0x50, 0x4E, 0x47]);
    }

    #[test]
    fn test_prepare_is_deterministic() {
        let input = create_test_image(2000, 1000);
        let preprocessor = ImagePreprocessor::new(1408).unwrap();

        let first = preprocessor.prepare(ImageSource::Bytes(&input)).unwrap();
        let second = preprocessor.prepare(ImageSource::Bytes(&input)).unwrap();
        assert_eq!((first.width(), first.height()), (1408, 704));
        assert_eq!(first, second);
    }

    #[test]
    fn test_load_accepts_image_over_default_alloc_limit() {
        // 16-bit RGBA at 8 bytes per pixel lands just over the crate's 512 MiB default
        let (width, height) = (8200, 8200);
        let default_cap = image::Limits::default().max_alloc.unwrap();
        assert!(u64::from(width) * u64::from(height) * 8 > default_cap);

        let mut png = Vec::new();
        {
            let img = image::ImageBuffer::<image::Rgba<u16>, _>::from_pixel(
                width,
                height,
                image::Rgba([1000, 2000, 3000, 65535]),
            );
            let encoder = image::codecs::png::PngEncoder::new_with_quality(
                Cursor::new(&mut png),
                image::codecs::png::CompressionType::Fast,
                image::codecs::png::FilterType::NoFilter,
            );
            DynamicImage::ImageRgba16(img)
                .write_with_encoder(encoder)
                .unwrap();
        }

        let img = load(ImageSource::Bytes(&png)).unwrap();
        assert_eq!(img.dimensions(), (width, height));
    }

    #[test]
    fn test_pixel_budget() {
        assert!(check_pixel_budget(12_000, 12_000).is_ok());
        assert!(check_pixel_budget(14_000, 14_000).is_err());

        let err = check_pixel_budget(20_000, 10_000).unwrap_err();
        assert!(matches!(err, Error::Decode(ImageError::Limits(_))));
    }

    #[test]
    fn test_prepare_is_idempotent_on_own_output() {
        let input = create_test_image(300, 200);
        let preprocessor = ImagePreprocessor::default();

        let first = preprocessor.prepare(ImageSource::Bytes(&input)).unwrap();
        let (png, _) = decode_payload(&first);
        let second = preprocessor.prepare(ImageSource::Bytes(&png)).unwrap();

        assert_eq!(first.as_str(), second.as_str());
    }

    #[test]
    fn test_prepare_converts_jpeg_input_to_png() {
        let img = image::RgbImage::from_pixel(40, 30, image::Rgb([10, 200, 30]));
        let mut jpeg = Vec::new();
        img.write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
            .unwrap();

        let payload = prepare(ImageSource::Bytes(&jpeg), 1408).unwrap();
        let (png, decoded) = decode_payload(&payload);

        assert_eq!(image::guess_format(&png).unwrap(), ImageFormat::Png);
        assert_eq!(decoded.dimensions(), (40, 30));
    }

    #[test]
    fn test_prepare_rejects_garbage() {
        let err = prepare(ImageSource::Bytes(b"definitely not an image"), 1408).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_prepare_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&create_test_image(1600, 800)).unwrap();

        let payload = prepare(ImageSource::Path(file.path()), 800).unwrap();
        assert_eq!((payload.width(), payload.height()), (800, 400));
    }

    #[test]
    fn test_prepare_missing_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.png");

        let err = prepare(ImageSource::Path(&missing), 1408).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_zero_max_dimension_rejected() {
        let err = ImagePreprocessor::new(0).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}

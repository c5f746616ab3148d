//! Encoding backend trait and the pure-Rust implementation.
//!
//! The `ImageBackend` trait abstracts the pixel work so the matrix driver
//! can be exercised with a mock that records operations instead of encoding.

use super::params::{EncodeFormat, TranscodeParams};
use image::ImageReader;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("encode failed: {0}")]
    Encode(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for encoding backends.
///
/// `Sync` because the transcoder shares one backend across rayon workers.
pub trait ImageBackend: Sync {
    /// Read image dimensions without decoding pixel data.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode, resize to the params' dimensions, and encode.
    fn transcode(&self, params: &TranscodeParams) -> Result<(), BackendError>;
}

/// Pure-Rust backend on the `image` crate ecosystem.
///
/// - Decoding: JPEG, PNG, GIF, WebP
/// - Encoding: WebP lossy (vendored libwebp via the `webp` crate), JPEG,
///   AVIF (rav1e), PNG
/// - Resampling: Lanczos3
pub struct RasterBackend;

impl RasterBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RasterBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RasterBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) =
            image::image_dimensions(path).map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(Dimensions { width, height })
    }

    fn transcode(&self, params: &TranscodeParams) -> Result<(), BackendError> {
        let img = ImageReader::open(&params.source)?
            .decode()
            .map_err(|e| BackendError::Decode(format!("{}: {e}", params.source.display())))?;

        let img = if img.width() > params.width || img.height() > params.height {
            img.resize(params.width, params.height, FilterType::Lanczos3)
        } else {
            img
        };

        let quality = params.quality.value();
        match params.format {
            EncodeFormat::Webp => {
                let rgba = img.to_rgba8();
                let encoder = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height());
                let encoded = encoder.encode(quality as f32);
                std::fs::write(&params.output, &*encoded)?;
            }
            EncodeFormat::Jpeg => {
                let writer = BufWriter::new(File::create(&params.output)?);
                let encoder = JpegEncoder::new_with_quality(writer, quality);
                img.to_rgb8()
                    .write_with_encoder(encoder)
                    .map_err(|e| BackendError::Encode(e.to_string()))?;
            }
            EncodeFormat::Avif => {
                let writer = BufWriter::new(File::create(&params.output)?);
                let encoder = AvifEncoder::new_with_speed_quality(writer, 6, quality);
                img.to_rgba8()
                    .write_with_encoder(encoder)
                    .map_err(|e| BackendError::Encode(e.to_string()))?;
            }
            EncodeFormat::Png => {
                let writer = BufWriter::new(File::create(&params.output)?);
                let encoder = PngEncoder::new(writer);
                img.write_with_encoder(encoder)
                    .map_err(|e| BackendError::Encode(e.to_string()))?;
            }
        }
        Ok(())
    }
}

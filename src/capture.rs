//! Still capture pipeline: decode → cover crop → mirror → resize → encode.
//!
//! The crop uses the same cover-fit geometry as the live guideline, so the
//! square written out is exactly the square the user was looking at.

use crate::config::{CaptureConfig, OutputFormat};
use crate::utils::safe_cast::f32_to_u8;
use crate::video::{StillCapture, StillRequest};
use crate::{Error, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbImage};
use log::debug;

/// Square region of a decoded still, in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub side: u32,
}

/// Centered square crop of a `width`×`height` image.
///
/// The side is `min(width, height)`; the long axis is offset by
/// `(long - short) / 2` (rounded down for odd differences), the short axis by zero.
pub fn cover_crop(width: u32, height: u32) -> CropRegion {
    let side = width.min(height);
    CropRegion {
        x: (width - side) / 2,
        y: (height - side) / 2,
        side,
    }
}

/// Final encoded artifact of one successful capture.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedImage {
    pub data: Vec<u8>,
    pub format: OutputFormat,
    /// Output side length (width == height)
    pub width: u32,
    pub height: u32,
    /// Decoded still size before cropping
    pub source_width: u32,
    pub source_height: u32,
}

impl CapturedImage {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// Produces square captures from stills according to one [`CaptureConfig`].
#[derive(Debug, Clone)]
pub struct CaptureService {
    config: CaptureConfig,
}

impl CaptureService {
    #[must_use]
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Request a still at the configured resolution and process it.
    pub fn capture(&self, still: &mut dyn StillCapture) -> Result<CapturedImage> {
        let request = StillRequest::from(&self.config);
        let encoded = still.capture_still(&request)?;
        self.process(&encoded)
    }

    /// Run the pipeline on an already encoded still.
    pub fn process(&self, encoded: &[u8]) -> Result<CapturedImage> {
        let decoded = decode_still(encoded)?;
        let (source_width, source_height) = (decoded.width(), decoded.height());
        if source_width == 0 || source_height == 0 {
            return Err(Error::ZeroDimensions);
        }

        let region = cover_crop(source_width, source_height);
        debug!(
            "Cropping {}x{} still to {}px square at ({}, {})",
            source_width, source_height, region.side, region.x, region.y
        );
        let mut square = decoded
            .crop_imm(region.x, region.y, region.side, region.side)
            .to_rgb8();

        if self.config.mirror {
            imageops::flip_horizontal_in_place(&mut square);
        }
        if let Some(size) = self.config.output_size {
            if size != square.width() {
                square = imageops::resize(&square, size, size, FilterType::Lanczos3);
            }
        }

        let data = encode_square(&square, self.config.format, self.config.quality)?;
        Ok(CapturedImage {
            data,
            format: self.config.format,
            width: square.width(),
            height: square.height(),
            source_width,
            source_height,
        })
    }
}

fn decode_still(encoded: &[u8]) -> Result<DynamicImage> {
    if encoded.is_empty() {
        return Err(Error::Decode("empty still image".to_string()));
    }
    image::load_from_memory(encoded).map_err(|e| Error::Decode(e.to_string()))
}

/// Encode an RGB image in the requested format. Only JPEG uses `quality`.
pub fn encode_square(image: &RgbImage, format: OutputFormat, quality: f32) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let (width, height) = image.dimensions();
    let result = match format {
        OutputFormat::Jpeg => {
            let quality_percent = f32_to_u8((quality * 100.0).round())?.clamp(1, 100);
            JpegEncoder::new_with_quality(&mut buffer, quality_percent).write_image(
                image.as_raw(),
                width,
                height,
                ExtendedColorType::Rgb8,
            )
        }
        OutputFormat::Png => {
            PngEncoder::new(&mut buffer).write_image(image.as_raw(), width, height, ExtendedColorType::Rgb8)
        }
        OutputFormat::Webp => {
            WebPEncoder::new_lossless(&mut buffer).write_image(image.as_raw(), width, height, ExtendedColorType::Rgb8)
        }
    };
    result.map_err(|e| Error::Encode(e.to_string()))?;
    Ok(buffer)
}

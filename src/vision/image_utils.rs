// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image decoding for uploaded files

use image::{DynamicImage, ImageFormat, RgbImage};
use thiserror::Error;

/// Custom error types for image decoding
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Image data is empty")]
    EmptyData,

    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("Decoded image has no pixels")]
    EmptyImage,
}

/// A fully decoded image, 8-bit RGB, row-major
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pixels: RgbImage,
    format: Option<ImageFormat>,
}

impl DecodedImage {
    /// Wrap an RGB buffer, rejecting zero-sized grids
    pub fn from_rgb(pixels: RgbImage) -> Result<Self, ImageError> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(ImageError::EmptyImage);
        }
        Ok(Self {
            pixels,
            format: None,
        })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Container format the image was decoded from, if known
    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }
}

/// Decode raw image bytes (for multipart uploads)
///
/// # Arguments
/// * `bytes` - Raw image bytes
///
/// # Returns
/// * `Ok(DecodedImage)` - RGB pixel grid with the source dimensions
/// * `Err(ImageError)` - If the bytes are not a PNG, JPEG, GIF or BMP image
pub fn decode_image_bytes(bytes: &[u8]) -> Result<DecodedImage, ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::EmptyData);
    }

    // Detect format from magic bytes
    let format = detect_format(bytes)?;

    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ImageError::DecodeFailed(e.to_string()))?;

    let mut decoded = DecodedImage::from_rgb(to_rgb(img))?;
    decoded.format = Some(format);
    Ok(decoded)
}

fn to_rgb(img: DynamicImage) -> RgbImage {
    match img {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => other.to_rgb8(),
    }
}

/// Detect image format from magic bytes
///
/// Only the containers accepted for upload are recognised.
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    if bytes.len() < 4 {
        return Err(ImageError::UnsupportedFormat);
    }

    match bytes {
        // PNG: 89 50 4E 47 (0x89 P N G)
        [0x89, 0x50, 0x4E, 0x47, ..] => Ok(ImageFormat::Png),

        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Ok(ImageFormat::Jpeg),

        // GIF: GIF87a or GIF89a
        [0x47, 0x49, 0x46, 0x38, x, ..] if *x == 0x37 || *x == 0x39 => Ok(ImageFormat::Gif),

        // BMP: BM
        [0x42, 0x4D, ..] => Ok(ImageFormat::Bmp),

        _ => Err(ImageError::UnsupportedFormat),
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the NudeNet detector

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;

/// Geometry needed to map model coordinates back onto the source image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PadInfo {
    /// Source image width
    pub orig_width: u32,
    /// Source image height
    pub orig_height: u32,
    /// Black columns added on the right
    pub pad_x: u32,
    /// Black rows added at the bottom
    pub pad_y: u32,
    /// Square model input size
    pub resolution: u32,
}

impl PadInfo {
    /// Factor from model input pixels to source image pixels
    pub fn scale(&self) -> f32 {
        (self.orig_width + self.pad_x) as f32 / self.resolution as f32
    }
}

/// Preprocess an image for detection
///
/// Steps:
/// 1. Resize so the longer side equals `resolution`, keeping aspect ratio (bilinear)
/// 2. Place at the top-left of a black `resolution x resolution` square
/// 3. Scale to [0, 1]
/// 4. Convert to NCHW tensor format [1, 3, R, R], RGB order
///
/// Equivalent to padding right/bottom to `max(width, height)` and resizing
/// the square, without ever allocating the full-size square.
pub fn preprocess_for_detection(image: &RgbImage, resolution: u32) -> (Array4<f32>, PadInfo) {
    let (orig_width, orig_height) = image.dimensions();
    let side = orig_width.max(orig_height);

    let pad = PadInfo {
        orig_width,
        orig_height,
        pad_x: side - orig_width,
        pad_y: side - orig_height,
        resolution,
    };

    let factor = resolution as f64 / side as f64;
    let scaled_width = ((orig_width as f64 * factor).round() as u32).clamp(1, resolution);
    let scaled_height = ((orig_height as f64 * factor).round() as u32).clamp(1, resolution);
    let resized = imageops::resize(image, scaled_width, scaled_height, FilterType::Triangle);

    // Everything outside the resized image stays zero (black padding)
    let size = resolution as usize;
    let mut tensor = Array4::zeros((1, 3, size, size));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    (tensor, pad)
}

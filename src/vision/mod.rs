// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module for CPU-based image analysis
//!
//! This module provides:
//! - Decoding of uploaded images
//! - The `Detector` trait used by the HTTP layer
//! - Nudity detection via NudeNet (ONNX)

pub mod detector;
pub mod image_utils;
pub mod nudenet;

pub use detector::{Detection, Detector};
pub use image_utils::{decode_image_bytes, detect_format, DecodedImage, ImageError};
pub use nudenet::NudeNetDetector;

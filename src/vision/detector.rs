// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detector seam between the HTTP layer and the inference backend

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::image_utils::DecodedImage;

/// One detected region
///
/// Serializes as `{"class": ..., "score": ..., "box": [x, y, width, height]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Label of the detected class
    #[serde(rename = "class")]
    pub label: String,
    /// Confidence score (0.0-1.0)
    pub score: f32,
    /// Top-left x, top-left y, width, height in source image pixels
    #[serde(rename = "box")]
    pub bounding_box: [i32; 4],
}

/// An object detector that can be shared across request handlers
///
/// Implementations must be safe to call from several threads at once,
/// serializing access internally if the backend requires it.
pub trait Detector: Send + Sync {
    /// Run detection on a decoded image
    fn detect(&self, image: &DecodedImage) -> Result<Vec<Detection>>;

    /// Short name of the backing model, used in logs
    fn name(&self) -> &str {
        "detector"
    }
}

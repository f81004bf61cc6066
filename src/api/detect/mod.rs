// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detect API endpoint module
//!
//! Provides POST /detect for classifying uploaded images.

pub mod handler;
pub mod response;
pub mod upload;

pub use handler::detect_handler;
pub use response::{secure_filename, DetectResponse};
pub use upload::{allowed_file, validate_filename, UploadError, UploadedImage, ALLOWED_EXTENSIONS};

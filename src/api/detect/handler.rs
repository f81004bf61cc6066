// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detect endpoint handler

use axum::{extract::State, Json};
use axum_extra::extract::multipart::MultipartRejection;
use axum_extra::extract::Multipart;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::response::DetectResponse;
use super::upload::{read_upload, UploadError};
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::vision::decode_image_bytes;

/// POST /detect - Classify an uploaded image
///
/// Accepts a multipart form with the image in the `image` field and returns
/// the detector output for it.
///
/// # Response
/// - `filename`: Sanitized upload filename
/// - `results`: Detections (`class`, `score`, `box`), possibly empty
/// - `status`: Always "success"
///
/// # Errors
/// - 400 Bad Request: No file, empty filename, disallowed extension, or an
///   undecodable image
/// - 500 Internal Server Error: Detection failed
pub async fn detect_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DetectResponse>, ApiError> {
    let start = Instant::now();

    // 1. Validate upload. A non-multipart request simply carries no file.
    let mut multipart = multipart.map_err(|e| {
        warn!("Detect request is not multipart: {}", e);
        ApiError::from(UploadError::NoFile)
    })?;

    let upload = read_upload(&mut multipart).await.map_err(|e| {
        warn!("Upload rejected: {}", e);
        e
    })?;

    debug!(
        "Received {} ({} bytes)",
        upload.filename,
        upload.data.len()
    );

    // 2. Decode image
    let data = upload.data.clone();
    let decoded = tokio::task::spawn_blocking(move || decode_image_bytes(&data))
        .await
        .map_err(|e| state.processing_error(e))?;

    let image = decoded.map_err(|e| {
        warn!("Failed to decode {}: {}", upload.filename, e);
        ApiError::InvalidImage
    })?;

    debug!(
        "Decoded image: {}x{}, format {:?}",
        image.width(),
        image.height(),
        image.format()
    );

    // 3. Run detector
    let detector = state.detector.clone();
    let results = tokio::task::spawn_blocking(move || detector.detect(&image))
        .await
        .map_err(|e| state.processing_error(e))?
        .map_err(|e| state.processing_error(format!("{:#}", e)))?;

    info!(
        "Detection complete for {}: {} regions, {}ms",
        upload.filename,
        results.len(),
        start.elapsed().as_millis()
    );

    // 4. Respond
    Ok(Json(DetectResponse::success(&upload.filename, results)))
}

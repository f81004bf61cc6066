// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::multipart::MultipartError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::detect::upload::UploadError;

/// Message returned when an upload cannot be decoded
pub const INVALID_IMAGE_MESSAGE: &str = "Invalid image format or corrupted file";

/// Message returned instead of the detail when detail exposure is disabled
pub const GENERIC_PROCESSING_DETAIL: &str = "internal error";

/// JSON body of every error response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// The upload is missing, unnamed or has a disallowed extension
    #[error("{0}")]
    Validation(#[from] UploadError),
    /// The payload is not a decodable image
    #[error("Invalid image format or corrupted file")]
    InvalidImage,
    /// The multipart body itself could not be read, including oversized bodies
    #[error("{0}")]
    MalformedUpload(String),
    /// Anything failing after validation and decoding
    #[error("Processing failed: {0}")]
    Processing(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Validation(_) | ApiError::InvalidImage | ApiError::MalformedUpload(_) => 400,
            ApiError::Processing(_) => 500,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        // Client errors only ever surface as 400, whatever the parser suggests
        ApiError::MalformedUpload(e.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_response())).into_response()
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload extraction and validation for POST /detect

use axum::body::Bytes;
use axum_extra::extract::Multipart;
use thiserror::Error;

use crate::api::errors::ApiError;

/// Multipart field carrying the image
pub const IMAGE_FIELD: &str = "image";

/// Accepted file extensions, compared case-insensitively
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "bmp"];

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("No image file provided")]
    NoFile,
    #[error("No file selected")]
    EmptyFilename,
    #[error("File type not allowed. Use: png, jpg, jpeg, gif, bmp")]
    DisallowedExtension,
}

/// A file taken from the request, owned by that request only
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Filename exactly as sent by the client
    pub filename: String,
    /// Raw file content
    pub data: Bytes,
}

/// Whether the filename carries an allowed extension after its last `.`
pub fn allowed_file(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) => {
            let ext = ext.to_lowercase();
            ALLOWED_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// Check the client-supplied filename of the image part
pub fn validate_filename(filename: &str) -> Result<(), UploadError> {
    if filename.is_empty() {
        return Err(UploadError::EmptyFilename);
    }
    if !allowed_file(filename) {
        return Err(UploadError::DisallowedExtension);
    }
    Ok(())
}

/// Find the first `image` file part and validate it
///
/// Parts named `image` without a filename are plain form values and do not
/// count as a file. The file content is only read once its name passed
/// validation.
pub async fn read_upload(multipart: &mut Multipart) -> Result<UploadedImage, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };

        validate_filename(&filename)?;
        let data = field.bytes().await?;
        return Ok(UploadedImage { filename, data });
    }

    Err(UploadError::NoFile.into())
}

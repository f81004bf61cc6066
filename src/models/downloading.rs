// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Download-on-first-run for the detector model
//!
//! Large files on the file host are served behind a virus-scan warning. The
//! first GET sets a `download_warning*` cookie whose value has to be echoed
//! back as `confirm` on a second GET to receive the actual bytes.

use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use sha2::{Digest, Sha256};
use std::path::Path;
use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

use super::ModelArtifact;

/// Size of the write buffer used while streaming the model to disk
pub const DOWNLOAD_CHUNK_SIZE: usize = 32 * 1024;

/// Cookie name prefix carrying the confirmation token
const CONFIRM_COOKIE_PREFIX: &str = "download_warning";

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Remote host returned HTTP {status}")]
    HttpStatus { status: u16 },
    #[error("Remote host returned an HTML page instead of the model file")]
    UnexpectedHtml,
    #[error("Checksum mismatch - expected: {expected}, actual: {actual}")]
    ChecksumMismatch { expected: String, actual: String },
}

/// Confirmation token found on the first response, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmToken(pub Option<String>);

impl ConfirmToken {
    /// Look for a `download_warning*` cookie among `(name, value)` pairs
    pub fn from_cookies<'a, I>(cookies: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let token = cookies
            .into_iter()
            .find(|(name, _)| name.starts_with(CONFIRM_COOKIE_PREFIX))
            .map(|(_, value)| value.to_string());
        Self(token)
    }

    pub fn is_required(&self) -> bool {
        self.0.is_some()
    }
}

/// What `ensure_model` had to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// A file already existed at the path, nothing was fetched
    AlreadyPresent,
    /// The model was downloaded
    Downloaded { bytes: u64, sha256: String },
}

/// Makes sure the model file exists before the server starts
pub struct ModelProvisioner {
    client: Client,
    download_url: String,
    expected_sha256: Option<String>,
}

impl ModelProvisioner {
    /// Create a provisioner talking to `download_url`
    ///
    /// The underlying client keeps cookies between requests, which the
    /// confirmation handshake relies on.
    pub fn new(download_url: impl Into<String>) -> Result<Self, DownloadError> {
        let client = Client::builder().cookie_store(true).build()?;
        Ok(Self {
            client,
            download_url: download_url.into(),
            expected_sha256: None,
        })
    }

    /// Require freshly downloaded files to match this SHA-256 (hex)
    pub fn with_expected_sha256(mut self, sha256: Option<String>) -> Self {
        self.expected_sha256 = sha256.map(|s| s.to_lowercase());
        self
    }

    /// Ensure the artifact exists locally, downloading it when absent
    ///
    /// Presence alone is trusted: an existing file is neither re-downloaded
    /// nor verified.
    pub async fn ensure_model(
        &self,
        artifact: &ModelArtifact,
    ) -> Result<ProvisionOutcome, DownloadError> {
        if tokio::fs::try_exists(&artifact.path).await? {
            info!("Model file found at {}", artifact.path.display());
            return Ok(ProvisionOutcome::AlreadyPresent);
        }

        info!(
            "Model file not found at {}, downloading from file host...",
            artifact.path.display()
        );

        let (bytes, sha256) = self.download(&artifact.remote_file_id, &artifact.path).await?;

        info!(
            "✅ Model downloaded successfully: {} bytes, sha256 {}",
            bytes, sha256
        );
        Ok(ProvisionOutcome::Downloaded { bytes, sha256 })
    }

    /// Run the two-step handshake and stream the file to `destination`
    pub async fn download(
        &self,
        file_id: &str,
        destination: &Path,
    ) -> Result<(u64, String), DownloadError> {
        let (response, token) = self.request_initial(file_id).await?;

        let response = match token {
            ConfirmToken(None) => response,
            ConfirmToken(Some(token)) => {
                debug!("File host asked for confirmation, retrying with token");
                self.request_confirmed(file_id, &token).await?
            }
        };

        let result = self.save_response_content(response, destination).await;
        if result.is_err() {
            // A partial file would satisfy the presence check on next start
            if let Err(e) = tokio::fs::remove_file(destination).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove partial model file: {}", e);
                }
            }
        }
        result
    }

    /// First GET, returning the response and any confirmation token
    async fn request_initial(
        &self,
        file_id: &str,
    ) -> Result<(Response, ConfirmToken), DownloadError> {
        let response = self
            .client
            .get(&self.download_url)
            .query(&[("id", file_id)])
            .send()
            .await?;

        let cookies: Vec<(String, String)> = response
            .cookies()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect();
        let token =
            ConfirmToken::from_cookies(cookies.iter().map(|(n, v)| (n.as_str(), v.as_str())));

        debug!(
            "Initial download response: HTTP {}, confirmation required: {}",
            response.status(),
            token.is_required()
        );

        Ok((response, token))
    }

    /// Second GET carrying the confirmation token
    async fn request_confirmed(
        &self,
        file_id: &str,
        token: &str,
    ) -> Result<Response, DownloadError> {
        let response = self
            .client
            .get(&self.download_url)
            .query(&[("id", file_id), ("confirm", token)])
            .send()
            .await?;
        Ok(response)
    }

    /// Stream the body to disk, returning the byte count and hex SHA-256
    async fn save_response_content(
        &self,
        response: Response,
        destination: &Path,
    ) -> Result<(u64, String), DownloadError> {
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase().starts_with("text/html"))
            .unwrap_or(false);
        if is_html {
            return Err(DownloadError::UnexpectedHtml);
        }

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let progress = match response.content_length() {
            Some(total) => {
                let bar = ProgressBar::new(total);
                if let Ok(style) = ProgressStyle::with_template(
                    "{bar:40} {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
                ) {
                    bar.set_style(style);
                }
                bar
            }
            None => ProgressBar::hidden(),
        };

        let file = tokio::fs::File::create(destination).await?;
        let mut writer = BufWriter::with_capacity(DOWNLOAD_CHUNK_SIZE, file);
        let mut hasher = Sha256::new();
        let mut written: u64 = 0;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if chunk.is_empty() {
                continue;
            }
            writer.write_all(&chunk).await?;
            hasher.update(&chunk);
            written += chunk.len() as u64;
            progress.set_position(written);
        }
        writer.flush().await?;
        progress.finish_and_clear();

        let actual = hex::encode(hasher.finalize());
        if let Some(ref expected) = self.expected_sha256 {
            if *expected != actual {
                return Err(DownloadError::ChecksumMismatch {
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        Ok((written, actual))
    }
}

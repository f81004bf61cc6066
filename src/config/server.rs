// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Server configuration, read from command line flags or environment variables

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::models::{ModelArtifact, DEFAULT_DOWNLOAD_URL, DEFAULT_MODEL_FILE_ID, DEFAULT_MODEL_PATH};

/// Default maximum accepted request body (10MB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Default detector input resolution
pub const DEFAULT_INFERENCE_RESOLUTION: u32 = 640;

/// NSFW detector node
#[derive(Parser, Debug, Clone)]
#[command(name = "nsfw-detector-node")]
#[command(about = "HTTP endpoint classifying uploaded images with the NudeNet detector", long_about = None)]
pub struct ServerConfig {
    /// Interface to bind the HTTP listener to
    #[arg(long, env = "API_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind the HTTP listener to
    #[arg(long, env = "API_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Local path of the ONNX model file
    #[arg(long, env = "MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
    pub model_path: PathBuf,

    /// Remote file identifier used when the model has to be downloaded
    #[arg(long, env = "MODEL_FILE_ID", default_value = DEFAULT_MODEL_FILE_ID)]
    pub model_file_id: String,

    /// Download endpoint of the remote file host
    #[arg(long, env = "MODEL_DOWNLOAD_URL", default_value = DEFAULT_DOWNLOAD_URL)]
    pub download_url: String,

    /// Expected SHA-256 (hex) of a freshly downloaded model
    #[arg(long, env = "MODEL_SHA256")]
    pub model_sha256: Option<String>,

    /// Square input resolution fed to the detector
    #[arg(long, env = "INFERENCE_RESOLUTION", default_value_t = DEFAULT_INFERENCE_RESOLUTION)]
    pub inference_resolution: u32,

    /// Maximum accepted request body size in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// Include internal error text in 500 responses
    #[arg(
        long,
        env = "EXPOSE_ERROR_DETAIL",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub expose_error_detail: bool,
}

impl ServerConfig {
    /// Validate values clap cannot check on its own
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.inference_resolution == 0 || self.inference_resolution % 32 != 0 {
            anyhow::bail!(
                "inference_resolution must be a positive multiple of 32, got {}",
                self.inference_resolution
            );
        }
        if self.model_file_id.trim().is_empty() {
            anyhow::bail!("model_file_id must not be empty");
        }
        if let Some(ref sha) = self.model_sha256 {
            if sha.len() != 64 || !sha.chars().all(|c| c.is_ascii_hexdigit()) {
                anyhow::bail!("model_sha256 must be 64 hex characters");
            }
        }
        Ok(())
    }

    /// Socket address the HTTP server binds to
    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port).parse()?;
        Ok(addr)
    }

    /// The model artifact described by this configuration
    pub fn model_artifact(&self) -> ModelArtifact {
        ModelArtifact {
            path: self.model_path.clone(),
            remote_file_id: self.model_file_id.clone(),
        }
    }
}

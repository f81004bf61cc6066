// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Model artifact provisioning
//!
//! The detector needs a single ONNX file on local disk. It is fetched from a
//! remote file host on first start and never touched again afterwards.

pub mod downloading;

use std::path::PathBuf;

pub use downloading::{
    ConfirmToken, DownloadError, ModelProvisioner, ProvisionOutcome, DOWNLOAD_CHUNK_SIZE,
};

/// Default local path of the NudeNet 640m model
pub const DEFAULT_MODEL_PATH: &str = "640m.onnx";

/// Remote identifier of the 640m model on the file host
pub const DEFAULT_MODEL_FILE_ID: &str = "1DF9b21MrgbWV2Zg0sqQBw6vsAgmgugyq";

/// Download endpoint of the file host, the file id is passed as `id`
pub const DEFAULT_DOWNLOAD_URL: &str = "https://docs.google.com/uc?export=download";

/// A model file on local disk plus where to get it from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelArtifact {
    /// Local path of the model file
    pub path: PathBuf,
    /// Identifier of the file on the remote host
    pub remote_file_id: String,
}

impl Default for ModelArtifact {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_MODEL_PATH),
            remote_file_id: DEFAULT_MODEL_FILE_ID.to_string(),
        }
    }
}

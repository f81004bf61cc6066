// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod config;
pub mod models;
pub mod vision;

// Re-export main types
pub use api::{create_app, AppState};
pub use config::ServerConfig;
pub use models::{ModelArtifact, ModelProvisioner};
pub use vision::{Detection, Detector, NudeNetDetector};

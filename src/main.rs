// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use nsfw_detector_node::{
    api::{start_server, AppState},
    config::ServerConfig,
    models::{ModelProvisioner, ProvisionOutcome},
    vision::NudeNetDetector,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before clap reads environment defaults
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::parse();
    if let Err(e) = config.validate() {
        eprintln!("❌ Invalid configuration: {}", e);
        std::process::exit(1);
    }

    println!("🚀 Starting NSFW detector node v{}...\n", env!("CARGO_PKG_VERSION"));

    // Model must be on disk before anything else happens
    let artifact = config.model_artifact();
    let provisioner = match ModelProvisioner::new(&config.download_url) {
        Ok(p) => p.with_expected_sha256(config.model_sha256.clone()),
        Err(e) => {
            eprintln!("❌ Failed to create download client: {}", e);
            std::process::exit(1);
        }
    };

    match provisioner.ensure_model(&artifact).await {
        Ok(ProvisionOutcome::AlreadyPresent) => {
            println!("✅ Model present at {}", artifact.path.display());
        }
        Ok(ProvisionOutcome::Downloaded { bytes, .. }) => {
            println!(
                "✅ Model downloaded to {} ({} bytes)",
                artifact.path.display(),
                bytes
            );
        }
        Err(e) => {
            eprintln!("❌ Failed to download model: {}", e);
            std::process::exit(1);
        }
    }

    // Detector is built once and shared by all requests
    println!("🧠 Loading detector...");
    let path = artifact.path.clone();
    let resolution = config.inference_resolution;
    let detector =
        match tokio::task::spawn_blocking(move || NudeNetDetector::new(path, resolution)).await? {
            Ok(d) => d,
            Err(e) => {
                eprintln!("❌ Failed to load detector: {:#}", e);
                std::process::exit(1);
            }
        };
    println!("✅ Detector loaded (resolution {})", detector.resolution());

    let state = AppState::new(Arc::new(detector))
        .with_expose_error_detail(config.expose_error_detail)
        .with_max_upload_bytes(config.max_upload_bytes);

    let addr = config.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    println!("\nAPI Endpoints:");
    println!("  Upload form:  http://{}/", addr);
    println!("  Detect:       POST http://{}/detect", addr);
    println!("\nTest with curl:");
    println!("  curl -F 'image=@photo.jpg' http://{}/detect", addr);
    println!("\nPress Ctrl+C to shutdown...\n");

    start_server(listener, state).await?;

    println!("👋 Goodbye!");
    Ok(())
}

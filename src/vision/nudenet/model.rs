// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! NudeNet ONNX detector

use anyhow::{Context, Result};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info};

use super::postprocessing::postprocess;
use super::preprocessing::preprocess_for_detection;
use crate::vision::detector::{Detection, Detector};
use crate::vision::image_utils::DecodedImage;

/// NudeNet detector running on ONNX Runtime
///
/// One session is shared by all requests. `Session::run` needs exclusive
/// access, so calls are serialized through a mutex.
#[derive(Clone)]
pub struct NudeNetDetector {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Square input resolution
    resolution: u32,
    model_path: PathBuf,
}

impl std::fmt::Debug for NudeNetDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NudeNetDetector")
            .field("input_name", &self.input_name)
            .field("resolution", &self.resolution)
            .field("model_path", &self.model_path)
            .finish_non_exhaustive()
    }
}

impl NudeNetDetector {
    /// Load the detector from an ONNX file
    ///
    /// # Arguments
    /// - `model_path`: Path to the ONNX model file (e.g. 640m.onnx)
    /// - `resolution`: Square input size the model was exported with
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    pub fn new<P: AsRef<Path>>(model_path: P, resolution: u32) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Detector model not found: {}", model_path.display());
        }

        info!("Loading NudeNet detector from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load detector model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        debug!("Detector model loaded - input: {}", input_name);

        info!(
            "✅ NudeNet detector loaded (resolution {}, CPU-only)",
            resolution
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            resolution,
            model_path: model_path.to_path_buf(),
        })
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }
}

impl Detector for NudeNetDetector {
    fn detect(&self, image: &DecodedImage) -> Result<Vec<Detection>> {
        let start = Instant::now();
        let (input, pad) = preprocess_for_detection(image.pixels(), self.resolution);

        let input_value = Tensor::from_array(input).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Detector session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Detection inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let detections = postprocess(output_tensor.view(), &pad)?;

        debug!(
            "Detected {} regions in {}x{} image, {}ms",
            detections.len(),
            image.width(),
            image.height(),
            start.elapsed().as_millis()
        );

        Ok(detections)
    }

    fn name(&self) -> &str {
        "nudenet-640m"
    }
}

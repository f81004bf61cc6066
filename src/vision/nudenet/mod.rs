// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! NudeNet nudity detector
//!
//! Components:
//! - `preprocessing` - Square padding and tensor conversion
//! - `postprocessing` - Candidate decoding and non-max suppression
//! - `model` - ONNX Runtime session wrapper

pub mod model;
pub mod postprocessing;
pub mod preprocessing;

pub use model::NudeNetDetector;
pub use postprocessing::LABELS;
pub use preprocessing::PadInfo;

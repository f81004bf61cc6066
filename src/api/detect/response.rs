// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detect response types

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;

use crate::vision::Detection;

/// Successful response from POST /detect
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectResponse {
    /// Sanitized upload filename
    pub filename: String,
    /// Detections, highest score first
    pub results: Vec<Detection>,
    /// Always "success"
    pub status: String,
}

impl DetectResponse {
    pub fn success(original_filename: &str, results: Vec<Detection>) -> Self {
        Self {
            filename: secure_filename(original_filename),
            results,
            status: "success".to_string(),
        }
    }
}

fn unsafe_chars() -> &'static Regex {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_.\-]").expect("valid regex"))
}

/// Reduce a client filename to something safe to use as a path component
///
/// The name is NFKD-folded to ASCII (`fête` -> `fete`), path separators
/// become whitespace, whitespace runs become `_`, every character outside
/// `[A-Za-z0-9_.-]` is dropped and leading/trailing `.` and `_` are trimmed.
/// The result may be empty.
pub fn secure_filename(filename: &str) -> String {
    let ascii: String = filename.nfkd().filter(char::is_ascii).collect();
    let separated = ascii.replace(['/', '\\'], " ");
    let joined = separated.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned = unsafe_chars().replace_all(&joined, "");
    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Decoding of YOLOv8-style detector output into detections

use anyhow::Result;
use ndarray::{ArrayView2, ArrayViewD, Axis};
use std::cmp::Ordering;

use super::preprocessing::PadInfo;
use crate::vision::detector::Detection;

/// Minimum class score for a candidate to be considered at all
pub const CANDIDATE_THRESHOLD: f32 = 0.2;

/// Minimum score kept by non-max suppression
pub const NMS_SCORE_THRESHOLD: f32 = 0.25;

/// Overlap above which the lower scoring box is dropped
pub const NMS_IOU_THRESHOLD: f32 = 0.45;

/// Class labels in model output order
pub const LABELS: [&str; 18] = [
    "FEMALE_GENITALIA_COVERED",
    "FACE_FEMALE",
    "BUTTOCKS_EXPOSED",
    "FEMALE_BREAST_EXPOSED",
    "FEMALE_GENITALIA_EXPOSED",
    "MALE_BREAST_EXPOSED",
    "ANUS_EXPOSED",
    "FEET_EXPOSED",
    "BELLY_COVERED",
    "FEET_COVERED",
    "ARMPITS_COVERED",
    "ARMPITS_EXPOSED",
    "FACE_MALE",
    "BELLY_EXPOSED",
    "MALE_GENITALIA_EXPOSED",
    "ANUS_COVERED",
    "FEMALE_BREAST_COVERED",
    "BUTTOCKS_COVERED",
];

/// A box that passed the candidate threshold, in source image pixels
#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    class_id: usize,
    score: f32,
    // x, y, width, height
    rect: [f32; 4],
}

/// Label for a class index
pub fn label_for(class_id: usize) -> String {
    LABELS
        .get(class_id)
        .map(|l| l.to_string())
        .unwrap_or_else(|| format!("CLASS_{}", class_id))
}

/// Convert raw model output into detections ordered by descending score
///
/// Accepts `[1, 4 + C, N]` or `[4 + C, N]` where each of the N columns is
/// `cx, cy, w, h` followed by C class scores.
pub fn postprocess(output: ArrayViewD<f32>, pad: &PadInfo) -> Result<Vec<Detection>> {
    let output = match output.ndim() {
        3 if output.shape()[0] == 1 => output.index_axis_move(Axis(0), 0),
        2 => output,
        _ => anyhow::bail!("Unexpected detector output shape: {:?}", output.shape()),
    };
    let output = output
        .into_dimensionality::<ndarray::Ix2>()
        .map_err(|e| anyhow::anyhow!("Unexpected detector output layout: {}", e))?;

    if output.shape()[0] < 5 {
        anyhow::bail!(
            "Detector output has {} features per box, expected at least 5",
            output.shape()[0]
        );
    }

    let candidates = collect_candidates(output, pad);
    let kept = non_max_suppression(&candidates, NMS_SCORE_THRESHOLD, NMS_IOU_THRESHOLD);

    Ok(kept
        .into_iter()
        .map(|i| {
            let c = &candidates[i];
            Detection {
                label: label_for(c.class_id),
                score: c.score,
                bounding_box: c.rect.map(|v| v.round() as i32),
            }
        })
        .collect())
}

fn collect_candidates(output: ArrayView2<f32>, pad: &PadInfo) -> Vec<Candidate> {
    let scale = pad.scale();
    let width = pad.orig_width as f32;
    let height = pad.orig_height as f32;

    let mut candidates = Vec::new();
    for column in output.axis_iter(Axis(1)) {
        let (class_id, score) = column
            .iter()
            .skip(4)
            .copied()
            .enumerate()
            .fold((0, f32::MIN), |best, (i, s)| if s > best.1 { (i, s) } else { best });

        if score < CANDIDATE_THRESHOLD {
            continue;
        }

        let (cx, cy, w, h) = (column[0], column[1], column[2], column[3]);
        let x = ((cx - w / 2.0) * scale).clamp(0.0, width);
        let y = ((cy - h / 2.0) * scale).clamp(0.0, height);
        let w = (w * scale).min(width - x);
        let h = (h * scale).min(height - y);

        candidates.push(Candidate {
            class_id,
            score,
            rect: [x, y, w, h],
        });
    }
    candidates
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let left = a[0].max(b[0]);
    let top = a[1].max(b[1]);
    let right = (a[0] + a[2]).min(b[0] + b[2]);
    let bottom = (a[1] + a[3]).min(b[1] + b[3]);

    let intersection = (right - left).max(0.0) * (bottom - top).max(0.0);
    let union = a[2] * a[3] + b[2] * b[3] - intersection;
    if union <= 0.0 {
        return 0.0;
    }
    intersection / union
}

/// Greedy non-max suppression, returns kept indices by descending score
fn non_max_suppression(
    candidates: &[Candidate],
    score_threshold: f32,
    iou_threshold: f32,
) -> Vec<usize> {
    let mut order: Vec<usize> = (0..candidates.len())
        .filter(|&i| candidates[i].score >= score_threshold)
        .collect();
    order.sort_by(|&a, &b| {
        candidates[b]
            .score
            .partial_cmp(&candidates[a].score)
            .unwrap_or(Ordering::Equal)
    });

    let mut kept: Vec<usize> = Vec::new();
    for i in order {
        let overlaps = kept
            .iter()
            .any(|&k| iou(&candidates[k].rect, &candidates[i].rect) > iou_threshold);
        if !overlaps {
            kept.push(i);
        }
    }
    kept
}

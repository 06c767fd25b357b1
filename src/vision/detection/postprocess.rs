// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Decoding of raw YOLO outputs into detections
//!
//! The export emits one tensor of shape [1, 4 + C, N] (or its transpose
//! [1, N, 4 + C]) where each of the N candidates carries `cx, cy, w, h` in
//! model input pixels followed by C class scores.

use anyhow::Result;
use ndarray::{ArrayView2, ArrayViewD, Axis, Ix2};

use super::labels::ClassNames;
use super::preprocessing::Letterbox;
use super::{BoundingBox, Detection};

/// Default IoU threshold for non-maximum suppression
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.7;

/// Default cap on detections returned per image
pub const DEFAULT_MAX_DETECTIONS: usize = 300;

/// A decoded candidate box in model input space
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Lay out a 2-D head output as [attributes, candidates]
///
/// With a known class count the attribute axis is the one of length 4 + C.
/// Without it, candidates are assumed to outnumber attributes, which holds for
/// every standard input size but not for tiny inputs with many classes.
fn orient_output(view: ArrayView2<f32>, num_classes: Option<usize>) -> ArrayView2<f32> {
    let (rows, cols) = view.dim();

    match num_classes.map(|c| c + 4) {
        Some(attributes) if rows == attributes => view,
        Some(attributes) if cols == attributes => view.reversed_axes(),
        _ if rows <= cols => view,
        _ => view.reversed_axes(),
    }
}

/// Decode the raw output tensor, keeping candidates whose best class score
/// exceeds `confidence_threshold`
///
/// `num_classes` comes from the model's class metadata when present and
/// decides which axis holds the attributes.
pub fn decode_candidates(
    output: ArrayViewD<f32>,
    confidence_threshold: f32,
    num_classes: Option<usize>,
) -> Result<Vec<Candidate>> {
    let shape = output.shape().to_vec();

    let view: ArrayView2<f32> = match shape.len() {
        3 if shape[0] == 1 => output
            .index_axis_move(Axis(0), 0)
            .into_dimensionality::<Ix2>()?,
        2 => output.into_dimensionality::<Ix2>()?,
        _ => anyhow::bail!("Unexpected detection output shape: {:?}", shape),
    };

    let view = orient_output(view, num_classes);
    let (attributes, num_candidates) = view.dim();

    if attributes <= 4 {
        anyhow::bail!(
            "Detection output has {} attributes per candidate, expected at least 5",
            attributes
        );
    }

    let mut candidates = Vec::new();

    for i in 0..num_candidates {
        let (class_id, score) = (4..attributes)
            .map(|a| (a - 4, view[[a, i]]))
            .fold((0, f32::MIN), |best, current| {
                if current.1 > best.1 {
                    current
                } else {
                    best
                }
            });

        if score.is_nan() || score <= confidence_threshold {
            continue;
        }

        let cx = view[[0, i]];
        let cy = view[[1, i]];
        let w = view[[2, i]];
        let h = view[[3, i]];

        candidates.push(Candidate {
            class_id,
            confidence: score.clamp(0.0, 1.0),
            bbox: BoundingBox {
                x1: cx - w / 2.0,
                y1: cy - h / 2.0,
                x2: cx + w / 2.0,
                y2: cy + h / 2.0,
            },
        });
    }

    Ok(candidates)
}

/// Class-aware greedy non-maximum suppression
///
/// Output is sorted by descending confidence and holds at most `max_detections`.
pub fn non_max_suppression(
    mut candidates: Vec<Candidate>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }

        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && k.bbox.iou(&candidate.bbox) > iou_threshold
        });

        if !suppressed {
            kept.push(candidate);
        }
    }

    kept
}

/// Map kept candidates back to source image coordinates
///
/// Boxes are clipped to the image and dropped when clipping leaves no area.
/// Ids are assigned in output order.
pub fn to_detections(
    candidates: Vec<Candidate>,
    letterbox: &Letterbox,
    image_width: u32,
    image_height: u32,
    class_names: &ClassNames,
) -> Vec<Detection> {
    let max_x = image_width as f32;
    let max_y = image_height as f32;

    candidates
        .into_iter()
        .filter_map(|candidate| {
            let (x1, y1) = letterbox.to_image_space(candidate.bbox.x1, candidate.bbox.y1);
            let (x2, y2) = letterbox.to_image_space(candidate.bbox.x2, candidate.bbox.y2);

            let bbox = BoundingBox {
                x1: x1.clamp(0.0, max_x),
                y1: y1.clamp(0.0, max_y),
                x2: x2.clamp(0.0, max_x),
                y2: y2.clamp(0.0, max_y),
            };

            if !bbox.is_valid() {
                return None;
            }

            Some((candidate.class_id, candidate.confidence, bbox))
        })
        .enumerate()
        .map(|(id, (class_id, confidence, bbox))| Detection {
            id,
            class_name: class_names.label(class_id),
            confidence,
            bbox,
        })
        .collect()
}

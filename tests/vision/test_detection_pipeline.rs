// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Decode pipeline without a model: letterbox an image, fabricate the raw
//! head output a YOLO export would produce for it, and check the decoded
//! detections land back on the source pixels.

use image::{Rgb, RgbImage};
use ndarray::Array3;
use object_detection_api::vision::detection::labels::ClassNames;
use object_detection_api::vision::detection::postprocess::{
    decode_candidates, non_max_suppression, to_detections,
};
use object_detection_api::vision::detection::preprocessing::preprocess_for_detection;
use object_detection_api::vision::draw_detections;

const INPUT_SIZE: u32 = 640;

/// Raw [1, 4 + C, N] output with one entry per (cx, cy, w, h, class, score)
fn head_output(classes: usize, entries: &[(f32, f32, f32, f32, usize, f32)]) -> Array3<f32> {
    let n = 32;
    let mut out = Array3::<f32>::zeros((1, 4 + classes, n));
    for (i, (cx, cy, w, h, class, score)) in entries.iter().enumerate() {
        out[[0, 0, i]] = *cx;
        out[[0, 1, i]] = *cy;
        out[[0, 2, i]] = *w;
        out[[0, 3, i]] = *h;
        out[[0, 4 + class, i]] = *score;
    }
    out
}

#[test]
fn test_pipeline_maps_boxes_back_to_wide_image() {
    // 1280x720 -> scale 0.5, content occupies y in [140, 500) of the canvas
    let image = RgbImage::from_pixel(1280, 720, Rgb([30, 30, 30]));
    let (tensor, letterbox) = preprocess_for_detection(&image, INPUT_SIZE);
    assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
    assert_eq!(letterbox.pad_y, 140.0);

    let output = head_output(
        2,
        &[
            // face at source (200,100)-(400,300)
            (150.0, 240.0, 100.0, 100.0, 0, 0.92),
            // duplicate of the face, lower score
            (152.0, 242.0, 100.0, 100.0, 0, 0.80),
            // person overlapping the face, other class
            (150.0, 240.0, 100.0, 100.0, 1, 0.70),
            // below threshold
            (500.0, 300.0, 40.0, 40.0, 0, 0.10),
        ],
    );

    let candidates = decode_candidates(output.view().into_dyn(), 0.25, Some(2)).unwrap();
    assert_eq!(candidates.len(), 3);

    let kept = non_max_suppression(candidates, 0.7, 300);
    assert_eq!(kept.len(), 2);

    let names = ClassNames::from_metadata("{0: 'face', 1: 'person'}").unwrap();
    let detections = to_detections(kept, &letterbox, 1280, 720, &names);

    assert_eq!(detections.len(), 2);
    assert_eq!(detections[0].class_name, "face");
    assert_eq!(detections[1].class_name, "person");
    assert!(detections[0].confidence > detections[1].confidence);

    let face = detections[0].bbox;
    assert!((face.x1 - 200.0).abs() < 1e-3);
    assert!((face.y1 - 100.0).abs() < 1e-3);
    assert!((face.x2 - 400.0).abs() < 1e-3);
    assert!((face.y2 - 300.0).abs() < 1e-3);

    // Drawing the result touches the outline only
    let mut annotated = image.clone();
    draw_detections(&mut annotated, &detections);
    assert_eq!(*annotated.get_pixel(200, 200), Rgb([0, 255, 0]));
    assert_eq!(*annotated.get_pixel(300, 200), Rgb([30, 30, 30]));
}

#[test]
fn test_pipeline_handles_transposed_head() {
    let image = RgbImage::from_pixel(640, 640, Rgb([0, 0, 0]));
    let (_, letterbox) = preprocess_for_detection(&image, INPUT_SIZE);

    let output = head_output(1, &[(320.0, 320.0, 64.0, 64.0, 0, 0.9)]);
    let transposed = output.permuted_axes([0, 2, 1]);

    let candidates = decode_candidates(transposed.view().into_dyn(), 0.25, None).unwrap();
    let detections = to_detections(
        non_max_suppression(candidates, 0.7, 300),
        &letterbox,
        640,
        640,
        &ClassNames::default(),
    );

    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].class_name, "class_0");
    assert!((detections[0].bbox.x1 - 288.0).abs() < 1e-3);
}

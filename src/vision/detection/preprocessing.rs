// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the detection model

use image::{imageops, imageops::FilterType, Rgb, RgbImage};
use ndarray::Array4;

/// Default square input size for YOLO exports
pub const DEFAULT_INPUT_SIZE: u32 = 640;

/// Gray used to pad the letterboxed canvas
pub const LETTERBOX_FILL: u8 = 114;

/// Geometry of a letterbox transform, used to map model coordinates back
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    /// Resize factor applied to the source image
    pub scale: f32,
    /// Horizontal padding (pixels) left of the resized image
    pub pad_x: f32,
    /// Vertical padding (pixels) above the resized image
    pub pad_y: f32,
    /// Resized image width inside the canvas
    pub resized_width: u32,
    /// Resized image height inside the canvas
    pub resized_height: u32,
}

impl Letterbox {
    /// Compute the letterbox for a `width` x `height` source and a square target
    pub fn compute(width: u32, height: u32, target_size: u32) -> Self {
        if width == 0 || height == 0 {
            return Self {
                scale: 1.0,
                pad_x: 0.0,
                pad_y: 0.0,
                resized_width: 0,
                resized_height: 0,
            };
        }

        let scale = (target_size as f32 / width as f32).min(target_size as f32 / height as f32);
        let resized_width = ((width as f32 * scale).round() as u32).clamp(1, target_size);
        let resized_height = ((height as f32 * scale).round() as u32).clamp(1, target_size);

        // Same rounding as the Ultralytics letterbox so boxes line up with the export
        let dw = (target_size - resized_width) as f32 / 2.0;
        let dh = (target_size - resized_height) as f32 / 2.0;

        Self {
            scale,
            pad_x: (dw - 0.1).round().max(0.0),
            pad_y: (dh - 0.1).round().max(0.0),
            resized_width,
            resized_height,
        }
    }

    /// Map a point from model input space to source image space
    pub fn to_image_space(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Preprocess an image for detection
///
/// Steps:
/// 1. Resize with aspect ratio preservation to fit `input_size`
/// 2. Center on a gray (114) square canvas
/// 3. Scale pixels to [0, 1]
/// 4. Convert interleaved RGB to NCHW tensor format [1, 3, S, S]
pub fn preprocess_for_detection(image: &RgbImage, input_size: u32) -> (Array4<f32>, Letterbox) {
    let letterbox = Letterbox::compute(image.width(), image.height(), input_size);
    let canvas = letterbox_image(image, &letterbox, input_size);

    let size = input_size as usize;
    let mut tensor = Array4::zeros((1, 3, size, size));

    for (x, y, pixel) in canvas.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    (tensor, letterbox)
}

/// Render the letterboxed canvas for `image`
pub fn letterbox_image(image: &RgbImage, letterbox: &Letterbox, input_size: u32) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(
        input_size,
        input_size,
        Rgb([LETTERBOX_FILL, LETTERBOX_FILL, LETTERBOX_FILL]),
    );

    if letterbox.resized_width == 0 || letterbox.resized_height == 0 {
        return canvas;
    }

    let resized = imageops::resize(
        image,
        letterbox.resized_width,
        letterbox.resized_height,
        FilterType::Triangle,
    );
    imageops::overlay(
        &mut canvas,
        &resized,
        letterbox.pad_x as i64,
        letterbox.pad_y as i64,
    );

    canvas
}

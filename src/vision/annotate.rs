// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Overlay drawing for detection results
//!
//! Each detection gets a green outline plus a filled label tab above its top
//! left corner reading `"{class} {confidence:.2}"` in black.

use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{PrimitiveStyle, PrimitiveStyleBuilder, Rectangle, StrokeAlignment},
    text::Text,
};
use image::{Rgb, RgbImage};

use super::detection::Detection;

/// Outline and label background color
pub const BOX_COLOR: Rgb888 = Rgb888::new(0, 255, 0);

/// Label text color
pub const LABEL_TEXT_COLOR: Rgb888 = Rgb888::new(0, 0, 0);

/// Outline width in pixels
pub const BOX_THICKNESS: u32 = 2;

/// Vertical padding between the label text and its tab edges
const LABEL_PADDING: i32 = 10;

/// Text shown above a detection box
pub fn format_label(detection: &Detection) -> String {
    format!("{} {:.2}", detection.class_name, detection.confidence)
}

/// Draw all detections onto `image` in place
pub fn draw_detections(image: &mut RgbImage, detections: &[Detection]) {
    let mut target = ImageDrawTarget::new(image);

    for detection in detections {
        draw_detection(&mut target, detection);
    }
}

fn draw_detection(target: &mut ImageDrawTarget<'_>, detection: &Detection) {
    let x1 = detection.bbox.x1 as i32;
    let y1 = detection.bbox.y1 as i32;
    let x2 = detection.bbox.x2 as i32;
    let y2 = detection.bbox.y2 as i32;

    let outline = PrimitiveStyleBuilder::new()
        .stroke_color(BOX_COLOR)
        .stroke_width(BOX_THICKNESS)
        .stroke_alignment(StrokeAlignment::Inside)
        .build();
    let _ = Rectangle::with_corners(Point::new(x1, y1), Point::new(x2, y2))
        .into_styled(outline)
        .draw(target);

    let label = format_label(detection);
    let text_width = (label.chars().count() as u32 * FONT_6X10.character_size.width) as i32;
    let text_height = FONT_6X10.character_size.height as i32;

    let _ = Rectangle::with_corners(
        Point::new(x1, y1 - text_height - LABEL_PADDING),
        Point::new(x1 + text_width, y1),
    )
    .into_styled(PrimitiveStyle::with_fill(BOX_COLOR))
    .draw(target);

    let style = MonoTextStyle::new(&FONT_6X10, LABEL_TEXT_COLOR);
    let _ = Text::new(&label, Point::new(x1, y1 - 5), style).draw(target);
}

/// Adapter letting embedded-graphics draw into an `RgbImage`; pixels outside
/// the image are dropped
struct ImageDrawTarget<'a> {
    image: &'a mut RgbImage,
}

impl<'a> ImageDrawTarget<'a> {
    fn new(image: &'a mut RgbImage) -> Self {
        Self { image }
    }
}

impl OriginDimensions for ImageDrawTarget<'_> {
    fn size(&self) -> Size {
        Size::new(self.image.width(), self.image.height())
    }
}

impl DrawTarget for ImageDrawTarget<'_> {
    type Color = Rgb888;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let width = self.image.width() as i32;
        let height = self.image.height() as i32;

        for Pixel(coord, color) in pixels {
            if coord.x < 0 || coord.y < 0 || coord.x >= width || coord.y >= height {
                continue;
            }
            self.image
                .put_pixel(coord.x as u32, coord.y as u32, Rgb([color.r(), color.g(), color.b()]));
        }

        Ok(())
    }
}

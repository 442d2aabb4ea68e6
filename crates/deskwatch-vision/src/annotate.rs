//! Box drawing for stream output.

use image::{Rgb, RgbImage};

use deskwatch_models::BoundingBox;

use crate::detector::Detection;

/// Outline color for detected objects.
pub const DETECTION_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
/// Outline color for registered regions on the full view.
pub const REGION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

const OUTLINE_THICKNESS: u32 = 2;

/// Draw a rectangle outline, clipping to the image bounds.
pub fn draw_box(
    image: &mut RgbImage,
    x_min: u32,
    y_min: u32,
    x_max: u32,
    y_max: u32,
    color: Rgb<u8>,
) {
    let (width, height) = image.dimensions();
    let x_max = x_max.min(width);
    let y_max = y_max.min(height);
    if x_min >= x_max || y_min >= y_max {
        return;
    }

    for t in 0..OUTLINE_THICKNESS {
        let top = y_min + t;
        let bottom = y_max.saturating_sub(1 + t);
        for x in x_min..x_max {
            if top < height {
                image.put_pixel(x, top, color);
            }
            if bottom > top {
                image.put_pixel(x, bottom, color);
            }
        }

        let left = x_min + t;
        let right = x_max.saturating_sub(1 + t);
        for y in y_min..y_max {
            if left < width {
                image.put_pixel(left, y, color);
            }
            if right > left {
                image.put_pixel(right, y, color);
            }
        }
    }
}

/// Copy the crop and outline every detected object on the copy.
///
/// The original crop is never mutated; consumers of the raw frame must not
/// observe annotation artifacts.
pub fn annotate_detections(crop: &RgbImage, detection: &Detection) -> RgbImage {
    let mut annotated = crop.clone();
    for b in &detection.boxes {
        draw_box(
            &mut annotated,
            b.x_min,
            b.y_min,
            b.x_max,
            b.y_max,
            DETECTION_COLOR,
        );
    }
    annotated
}

/// Copy the full frame and outline every registered region on the copy.
pub fn outline_regions(frame: &RgbImage, boxes: &[BoundingBox]) -> RgbImage {
    let mut annotated = frame.clone();
    for bbox in boxes {
        draw_box(
            &mut annotated,
            bbox.x_min,
            bbox.y_min,
            bbox.x_max,
            bbox.y_max,
            REGION_COLOR,
        );
    }
    annotated
}

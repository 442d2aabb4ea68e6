//! Captured frames.

use std::time::SystemTime;

use image::RgbImage;

use deskwatch_models::BoundingBox;

/// A captured video frame.
///
/// Immutable once constructed. The generation counter increases by one per
/// successful capture cycle, so consumers can bound how stale the frame they
/// are holding is relative to the newest capture.
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbImage,
    captured_at: SystemTime,
    generation: u64,
}

impl Frame {
    pub fn new(image: RgbImage, captured_at: SystemTime, generation: u64) -> Self {
        Self {
            image,
            captured_at,
            generation,
        }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn captured_at(&self) -> SystemTime {
        self.captured_at
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Extract an independent copy of the sub-image covered by `bbox`.
    ///
    /// The box is intersected with the frame bounds first; `None` means the
    /// intersection was empty and the caller should skip this cycle.
    pub fn crop(&self, bbox: &BoundingBox) -> Option<RgbImage> {
        let clamped = bbox.clamp_to(self.width(), self.height())?;
        Some(
            image::imageops::crop_imm(
                &self.image,
                clamped.x_min,
                clamped.y_min,
                clamped.width(),
                clamped.height(),
            )
            .to_image(),
        )
    }
}

/// Mirror a frame horizontally, matching the natural mirror-view convention
/// for a user-facing camera.
pub fn mirror(image: &RgbImage) -> RgbImage {
    image::imageops::flip_horizontal(image)
}

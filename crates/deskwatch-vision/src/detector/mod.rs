//! The object-detection capability.
//!
//! The engine treats detection as an opaque capability: crop in, tracked
//! object boxes out. Providers are swappable behind the [`Detector`] trait;
//! the real YOLOv8 backend lives behind the `detector-onnx` feature so the
//! default build has no ONNX Runtime prerequisite.

use image::RgbImage;

use crate::error::VisionResult;

#[cfg(feature = "detector-onnx")]
pub mod onnx;

/// One detected object of the tracked class, in crop pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionBox {
    pub x_min: u32,
    pub y_min: u32,
    pub x_max: u32,
    pub y_max: u32,
    pub confidence: f32,
}

/// Result of one detection call: the tracked-class objects found in a crop.
#[derive(Debug, Clone, Default)]
pub struct Detection {
    pub boxes: Vec<DetectionBox>,
}

impl Detection {
    pub fn count(&self) -> usize {
        self.boxes.len()
    }

    /// Presence for the accumulation cycle: at least one tracked object.
    pub fn present(&self) -> bool {
        !self.boxes.is_empty()
    }
}

/// An object detector for the tracked class.
///
/// Implementations must be pure with respect to the engine: no side effects
/// beyond compute. Callers guarantee a non-empty crop.
pub trait Detector: Send + Sync {
    fn detect(&self, crop: &RgbImage) -> VisionResult<Detection>;

    /// Backend name for startup logging.
    fn name(&self) -> &'static str;
}

/// Detector returning a fixed response on every call.
///
/// Placeholder backend when no real detector is compiled in, and the
/// presence control used throughout the engine tests.
#[derive(Debug, Clone, Default)]
pub struct StaticDetector {
    detection: Detection,
}

impl StaticDetector {
    /// Never reports presence.
    pub fn always_empty() -> Self {
        Self::default()
    }

    /// Reports the same detection on every call.
    pub fn always(detection: Detection) -> Self {
        Self { detection }
    }

    /// Reports one full-confidence box covering the top-left quadrant.
    pub fn always_present() -> Self {
        Self::always(Detection {
            boxes: vec![DetectionBox {
                x_min: 0,
                y_min: 0,
                x_max: 8,
                y_max: 8,
                confidence: 1.0,
            }],
        })
    }
}

impl Detector for StaticDetector {
    fn detect(&self, _crop: &RgbImage) -> VisionResult<Detection> {
        Ok(self.detection.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_detector_presence() {
        let crop = RgbImage::new(16, 16);
        let empty = StaticDetector::always_empty();
        assert!(!empty.detect(&crop).unwrap().present());

        let present = StaticDetector::always_present();
        let detection = present.detect(&crop).unwrap();
        assert!(detection.present());
        assert_eq!(detection.count(), 1);
    }
}

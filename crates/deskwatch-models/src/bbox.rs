//! Pixel-space bounding boxes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when parsing or validating a bounding box.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoundingBoxError {
    #[error("Expected four space-separated integers, got {0:?}")]
    Malformed(String),

    #[error("Degenerate box: {0}")]
    Degenerate(String),
}

/// An axis-aligned rectangle in source-frame pixel coordinates.
///
/// The box doubles as the region's natural identity: two regions are the
/// same record if and only if their boxes are exactly equal. The canonical
/// wire and storage form is four space-separated integers,
/// `"x_min y_min x_max y_max"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: u32,
    pub y_min: u32,
    pub x_max: u32,
    pub y_max: u32,
}

impl BoundingBox {
    pub fn new(x_min: u32, y_min: u32, x_max: u32, y_max: u32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Check that the box has positive width and height.
    pub fn is_valid(&self) -> bool {
        self.x_min < self.x_max && self.y_min < self.y_max
    }

    pub fn width(&self) -> u32 {
        self.x_max.saturating_sub(self.x_min)
    }

    pub fn height(&self) -> u32 {
        self.y_max.saturating_sub(self.y_min)
    }

    /// Intersect with a `frame_width` x `frame_height` frame.
    ///
    /// Returns `None` when the intersection is empty, i.e. the box lies
    /// entirely outside the frame.
    pub fn clamp_to(&self, frame_width: u32, frame_height: u32) -> Option<BoundingBox> {
        let clamped = BoundingBox {
            x_min: self.x_min.min(frame_width),
            y_min: self.y_min.min(frame_height),
            x_max: self.x_max.min(frame_width),
            y_max: self.y_max.min(frame_height),
        };
        clamped.is_valid().then_some(clamped)
    }

    /// Validate, mapping a degenerate box to an error.
    pub fn validated(self) -> Result<Self, BoundingBoxError> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(BoundingBoxError::Degenerate(self.to_string()))
        }
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.x_min, self.y_min, self.x_max, self.y_max
        )
    }
}

impl FromStr for BoundingBox {
    type Err = BoundingBoxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        if parts.len() != 4 {
            return Err(BoundingBoxError::Malformed(s.to_string()));
        }

        let mut coords = [0u32; 4];
        for (slot, part) in coords.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| BoundingBoxError::Malformed(s.to_string()))?;
        }

        Ok(BoundingBox::new(coords[0], coords[1], coords[2], coords[3]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_format_round_trip() {
        let bbox: BoundingBox = "10 10 110 110".parse().unwrap();
        assert_eq!(bbox, BoundingBox::new(10, 10, 110, 110));
        assert_eq!(bbox.to_string(), "10 10 110 110");
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!("10 10 110".parse::<BoundingBox>().is_err());
        assert!("10 10 110 110 5".parse::<BoundingBox>().is_err());
        assert!("a b c d".parse::<BoundingBox>().is_err());
        assert!("10 10 -5 110".parse::<BoundingBox>().is_err());
        assert!("".parse::<BoundingBox>().is_err());
    }

    #[test]
    fn test_degenerate_boxes_are_invalid() {
        assert!(!BoundingBox::new(10, 10, 10, 110).is_valid());
        assert!(!BoundingBox::new(10, 10, 110, 10).is_valid());
        assert!(!BoundingBox::new(110, 10, 10, 110).is_valid());
        assert!(BoundingBox::new(10, 10, 110, 110).is_valid());
    }

    #[test]
    fn test_clamp_to_frame() {
        let bbox = BoundingBox::new(600, 400, 700, 500);
        let clamped = bbox.clamp_to(640, 480).unwrap();
        assert_eq!(clamped, BoundingBox::new(600, 400, 640, 480));

        // Fully outside the frame
        assert!(bbox.clamp_to(600, 400).is_none());
        // Fully inside is untouched
        let inside = BoundingBox::new(10, 10, 110, 110);
        assert_eq!(inside.clamp_to(640, 480), Some(inside));
    }

    #[test]
    fn test_width_height() {
        let bbox = BoundingBox::new(10, 20, 110, 220);
        assert_eq!(bbox.width(), 100);
        assert_eq!(bbox.height(), 200);
    }
}

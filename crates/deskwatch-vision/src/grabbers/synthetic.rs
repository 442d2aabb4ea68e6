//! Synthetic test-pattern capture backend.

use image::{Rgb, RgbImage};

use crate::error::VisionResult;
use crate::grabbers::FrameGrabber;

/// Generates a moving bright square over a gradient background.
///
/// Default capture backend: deterministic, dependency-free, and visibly
/// animated so stream consumers can tell the pipeline is alive.
#[derive(Debug, Clone)]
pub struct SyntheticGrabber {
    width: u32,
    height: u32,
    tick: u64,
}

impl SyntheticGrabber {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tick: 0,
        }
    }

    fn render(&self) -> RgbImage {
        let square = (self.height / 4).max(1);
        let travel = self.width.saturating_sub(square).max(1) as u64;
        let sx = ((self.tick * 3) % travel) as u32;
        let sy = (self.height - square) / 2;

        RgbImage::from_fn(self.width, self.height, |x, y| {
            if x >= sx && x < sx + square && y >= sy && y < sy + square {
                Rgb([240, 240, 240])
            } else {
                let shade = ((x + y + self.tick as u32) % 128) as u8;
                Rgb([shade, shade / 2, 96])
            }
        })
    }
}

impl Default for SyntheticGrabber {
    fn default() -> Self {
        Self::new(640, 480)
    }
}

impl FrameGrabber for SyntheticGrabber {
    fn grab(&mut self) -> VisionResult<RgbImage> {
        let image = self.render();
        self.tick += 1;
        Ok(image)
    }

    fn describe(&self) -> String {
        format!("synthetic {}x{}", self.width, self.height)
    }
}

//! Capture backends.
//!
//! A grabber produces one raw frame per call; the frame source owns the
//! capture loop, pacing, and mirroring. The synthetic backend keeps the
//! default build free of native dependencies; real cameras come in behind
//! the `capture-opencv` feature.

use image::RgbImage;

use crate::error::VisionResult;

mod synthetic;

#[cfg(feature = "capture-opencv")]
pub mod opencv;

pub use synthetic::SyntheticGrabber;

/// A source of raw frames, driven by the capture thread.
pub trait FrameGrabber: Send {
    /// Capture one frame. A transient error skips the cycle; the frame
    /// source retains the previous frame.
    fn grab(&mut self) -> VisionResult<RgbImage>;

    /// Human-readable backend description for startup logging.
    fn describe(&self) -> String;
}

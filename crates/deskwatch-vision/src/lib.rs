//! Frame capture and object detection for the deskwatch backend.
//!
//! This crate provides:
//! - The `Frame` type: an immutable-once-captured RGB buffer with a capture
//!   timestamp and a generation counter for explicit staleness tracking
//! - A frame source running continuous capture on a dedicated thread and
//!   exposing the freshest frame to any number of readers
//! - Pluggable capture backends (synthetic test pattern by default, OpenCV
//!   videoio behind the `capture-opencv` feature)
//! - The detection capability as an object-safe trait, with a YOLOv8 ONNX
//!   provider behind the `detector-onnx` feature
//! - Box annotation and JPEG encoding for stream consumers

pub mod annotate;
pub mod capture;
pub mod detector;
pub mod encode;
pub mod error;
pub mod frame;
pub mod grabbers;

pub use capture::FrameSource;
pub use detector::{Detection, DetectionBox, Detector, StaticDetector};
pub use encode::encode_jpeg;
pub use error::{VisionError, VisionResult};
pub use frame::Frame;
pub use grabbers::{FrameGrabber, SyntheticGrabber};

#[cfg(feature = "capture-opencv")]
pub use grabbers::opencv::OpenCvGrabber;

#[cfg(feature = "detector-onnx")]
pub use detector::onnx::{OnnxDetector, OnnxDetectorConfig};

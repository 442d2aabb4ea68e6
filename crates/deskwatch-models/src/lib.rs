//! Shared data models for the deskwatch backend.
//!
//! This crate provides Serde-serializable types for:
//! - Pixel-space bounding boxes (the natural identity of a tracked region)
//! - Stable region handles assigned at creation
//! - Region snapshots exposed on the control surface

pub mod bbox;
pub mod region;

// Re-export common types
pub use bbox::{BoundingBox, BoundingBoxError};
pub use region::{RegionId, RegionSnapshot};

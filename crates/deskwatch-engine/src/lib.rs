//! Region occupancy tracking and dwell-time accumulation.
//!
//! This crate owns the core of the system:
//! - The ROI registry: the mutable, shared list of tracked regions
//! - The dwell-time accumulator: presence booleans in, whole-second
//!   persistence commits out
//! - The engine tick loop coordinating frames, detection, accumulation,
//!   and the persistent store
//! - The stream multiplexer composing per-region views into a grid

pub mod config;
pub mod dwell;
pub mod engine;
pub mod error;
pub mod mux;
pub mod registry;

pub use config::EngineConfig;
pub use dwell::DwellClock;
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use mux::GridComposer;
pub use registry::{RegionCell, RegionRegistry, RegionState};

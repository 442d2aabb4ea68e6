//! Engine error types.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by the tracking engine.
///
/// Caller errors (`InvalidRegion`, `InvalidIndex`, `NotFound`) are reported
/// synchronously and never change state. Store and vision failures inside
/// the accumulation loop are logged and skipped, never propagated out of a
/// cycle.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    #[error("Invalid region index: {0}")]
    InvalidIndex(usize),

    #[error("Region not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] deskwatch_store::StoreError),

    #[error("Vision error: {0}")]
    Vision(#[from] deskwatch_vision::VisionError),
}

impl EngineError {
    pub fn invalid_region(msg: impl Into<String>) -> Self {
        Self::InvalidRegion(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

//! Axum HTTP control surface for the region tracker.
//!
//! This crate provides:
//! - REST endpoints for region lifecycle and dwell-time queries
//! - MJPEG streaming of the annotated full view, the per-region views, and
//!   the combined grid
//! - Health and readiness probes

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;

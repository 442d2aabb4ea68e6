//! SQLite persistence for region dwell-time records.
//!
//! This crate provides:
//! - A typed repository over the `regions` table
//! - Full-table scans for registry rehydration at startup
//! - Best-effort dwell-time updates issued by the accumulation engine

pub mod error;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use store::{PersistedRegion, RegionStore};

//! Request handlers.

pub mod feeds;
pub mod health;
pub mod regions;

pub use health::{health, ready};

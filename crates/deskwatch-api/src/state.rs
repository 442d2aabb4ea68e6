//! Application state.

use std::sync::Arc;

use deskwatch_engine::Engine;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub engine: Arc<Engine>,
}

impl AppState {
    pub fn new(config: ApiConfig, engine: Arc<Engine>) -> Self {
        Self { config, engine }
    }
}

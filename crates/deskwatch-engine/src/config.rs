//! Engine configuration.

use std::time::Duration;

/// Tunables for the accumulation and streaming loops.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Duty rate of the accumulation loop
    pub tick_interval: Duration,
    /// Pacing of MJPEG stream output
    pub stream_interval: Duration,
    /// Wait between polls while a region's crop is still absent
    pub idle_wait: Duration,
    /// Fixed column count of the combined grid view
    pub grid_columns: u32,
    /// JPEG quality for stream encoding (1-100)
    pub jpeg_quality: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            stream_interval: Duration::from_millis(30),
            idle_wait: Duration::from_millis(100),
            grid_columns: 2,
            jpeg_quality: 50,
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            tick_interval: env_millis("DWELL_TICK_MS", defaults.tick_interval),
            stream_interval: env_millis("STREAM_INTERVAL_MS", defaults.stream_interval),
            idle_wait: env_millis("STREAM_IDLE_WAIT_MS", defaults.idle_wait),
            grid_columns: std::env::var("GRID_COLUMNS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&c| c > 0)
                .unwrap_or(defaults.grid_columns),
            jpeg_quality: std::env::var("JPEG_QUALITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.jpeg_quality),
        }
    }
}

fn env_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

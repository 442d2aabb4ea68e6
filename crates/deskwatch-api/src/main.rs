//! Axum API server binary.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use deskwatch_api::{create_router, ApiConfig, AppState};
use deskwatch_engine::{Engine, EngineConfig};
use deskwatch_store::RegionStore;
use deskwatch_vision::{Detector, FrameGrabber, FrameSource};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("deskwatch=info".parse().expect("valid directive"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting deskwatch-api");

    let config = ApiConfig::from_env();
    let engine_config = EngineConfig::from_env();
    info!("API config: host={}, port={}", config.host, config.port);

    let db_path = std::env::var("DESKWATCH_DB").unwrap_or_else(|_| "deskwatch.db".to_string());
    let store = match RegionStore::open(&db_path).await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to open region store at {}: {}", db_path, e);
            std::process::exit(1);
        }
    };

    let frames = match FrameSource::start(build_grabber(), capture_interval()) {
        Ok(f) => f,
        Err(e) => {
            error!("Failed to start frame capture: {}", e);
            std::process::exit(1);
        }
    };

    let engine = Arc::new(Engine::new(store, frames, build_detector(), engine_config));

    if let Err(e) = engine.rehydrate().await {
        error!("Failed to load persisted regions: {}", e);
        std::process::exit(1);
    }

    let tick_loop = engine.spawn_tick_loop();

    let state = AppState::new(config.clone(), Arc::clone(&engine));
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid bind address");
    info!("Listening on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
    }

    tick_loop.abort();
    engine.shutdown();
    engine.store().close().await;
    info!("Server shutdown complete");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    info!("Received shutdown signal");
}

fn capture_interval() -> Duration {
    let ms = std::env::var("CAPTURE_INTERVAL_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(33);
    Duration::from_millis(ms)
}

fn frame_size() -> (u32, u32) {
    let width = std::env::var("FRAME_WIDTH")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(640);
    let height = std::env::var("FRAME_HEIGHT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(480);
    (width, height)
}

#[cfg(feature = "capture-opencv")]
fn build_grabber() -> Box<dyn FrameGrabber> {
    use deskwatch_vision::OpenCvGrabber;

    let index = std::env::var("CAMERA_INDEX")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let (width, height) = frame_size();

    match OpenCvGrabber::open(index, width, height) {
        Ok(grabber) => Box::new(grabber),
        Err(e) => {
            error!("Failed to open camera {}: {}", index, e);
            std::process::exit(1);
        }
    }
}

#[cfg(not(feature = "capture-opencv"))]
fn build_grabber() -> Box<dyn FrameGrabber> {
    use deskwatch_vision::SyntheticGrabber;

    let (width, height) = frame_size();
    warn!("Built without a camera backend; using the synthetic test pattern");
    Box::new(SyntheticGrabber::new(width, height))
}

#[cfg(feature = "detector-onnx")]
fn build_detector() -> Arc<dyn Detector> {
    use deskwatch_vision::{OnnxDetector, OnnxDetectorConfig};

    let mut config = OnnxDetectorConfig::default();
    if let Ok(path) = std::env::var("DETECTOR_MODEL") {
        config.model_path = path;
    }
    if let Some(threshold) = std::env::var("DETECTOR_CONFIDENCE")
        .ok()
        .and_then(|s| s.parse().ok())
    {
        config.confidence_threshold = threshold;
    }

    match OnnxDetector::new(config) {
        Ok(detector) => Arc::new(detector),
        Err(e) => {
            error!("Failed to load detection model: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(not(feature = "detector-onnx"))]
fn build_detector() -> Arc<dyn Detector> {
    use deskwatch_vision::StaticDetector;

    warn!("Built without a detection backend; regions will accumulate no dwell time");
    Arc::new(StaticDetector::always_empty())
}

//! MJPEG streaming handlers.
//!
//! Each stream is a `multipart/x-mixed-replace` response fed by a dedicated
//! task that samples the engine at the configured pacing and pushes one JPEG
//! part per cycle. The task ends when the client disconnects (the channel
//! closes) or, for per-region streams, when the region is removed.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use image::RgbImage;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::warn;

use deskwatch_engine::Engine;
use deskwatch_models::RegionId;
use deskwatch_vision::encode_jpeg;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// One poll of a stream's frame producer.
enum FramePoll {
    /// A frame to encode and push.
    Frame(RgbImage),
    /// Nothing to show this cycle; wait and poll again.
    Idle,
    /// The source is gone; end the stream.
    Ended,
}

impl From<Option<RgbImage>> for FramePoll {
    fn from(image: Option<RgbImage>) -> Self {
        match image {
            Some(image) => FramePoll::Frame(image),
            None => FramePoll::Idle,
        }
    }
}

/// Stream the annotated full view.
pub async fn full_feed(State(state): State<AppState>) -> Response {
    stream_frames(Arc::clone(&state.engine), |engine| {
        engine.annotated_frame().into()
    })
}

/// Stream the combined grid of per-region views.
pub async fn grid_feed(State(state): State<AppState>) -> Response {
    stream_frames(Arc::clone(&state.engine), |engine| {
        engine.grid_frame().into()
    })
}

/// Stream one region's annotated crop.
///
/// 404 for an unknown handle; an established stream ends cleanly when the
/// region is removed.
pub async fn region_feed(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Response> {
    let id = RegionId(id);
    if !state.engine.region_exists(id) {
        return Err(ApiError::not_found(format!("region {id}")));
    }

    Ok(stream_frames(Arc::clone(&state.engine), move |engine| {
        match engine.region_crop(id) {
            Ok(crop) => crop.into(),
            Err(_) => FramePoll::Ended,
        }
    }))
}

/// Spawn the part-producer task and wire it to a streaming response body.
fn stream_frames<F>(engine: Arc<Engine>, produce: F) -> Response
where
    F: Fn(&Engine) -> FramePoll + Send + 'static,
{
    let config = engine.config().clone();
    let (tx, rx) = mpsc::channel::<Bytes>(2);

    tokio::spawn(async move {
        loop {
            match produce(&engine) {
                FramePoll::Frame(image) => {
                    match encode_jpeg(&image, config.jpeg_quality) {
                        Ok(jpeg) => {
                            if tx.send(mjpeg_part(jpeg)).await.is_err() {
                                // Client disconnected
                                return;
                            }
                        }
                        Err(e) => warn!("JPEG encoding failed, skipping frame: {}", e),
                    }
                    tokio::time::sleep(config.stream_interval).await;
                }
                FramePoll::Idle => tokio::time::sleep(config.idle_wait).await,
                FramePoll::Ended => return,
            }
        }
    });

    let stream = ReceiverStream::new(rx).map(Ok::<_, Infallible>);
    (
        [(header::CONTENT_TYPE, CONTENT_TYPE)],
        Body::from_stream(stream),
    )
        .into_response()
}

fn mjpeg_part(jpeg: Vec<u8>) -> Bytes {
    let mut part = Vec::with_capacity(jpeg.len() + 48);
    part.extend_from_slice(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n");
    part.extend_from_slice(&jpeg);
    part.extend_from_slice(b"\r\n");
    Bytes::from(part)
}

//! Region lifecycle and dwell-time query handlers.

use std::str::FromStr;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use deskwatch_models::{BoundingBox, RegionId};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Region create/remove request.
///
/// The bbox is four space-separated integers: `"x_min y_min x_max y_max"`.
#[derive(Debug, Deserialize)]
pub struct RegionRequest {
    #[serde(alias = "ROI")]
    pub roi: String,
}

impl RegionRequest {
    fn parse_bbox(&self) -> ApiResult<BoundingBox> {
        BoundingBox::from_str(&self.roi).map_err(|e| ApiError::bad_request(e.to_string()))
    }
}

/// Region create response.
#[derive(Serialize)]
pub struct AddRegionResponse {
    pub status: String,
    pub id: RegionId,
    pub index: usize,
}

/// Create a tracked region.
pub async fn add_region(
    State(state): State<AppState>,
    Json(request): Json<RegionRequest>,
) -> ApiResult<Json<AddRegionResponse>> {
    let bbox = request.parse_bbox()?;
    let (id, index) = state.engine.add_region(bbox).await?;

    Ok(Json(AddRegionResponse {
        status: "success".to_string(),
        id,
        index,
    }))
}

/// Status-only response.
#[derive(Serialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Remove a tracked region by exact bbox match.
pub async fn remove_region(
    State(state): State<AppState>,
    Json(request): Json<RegionRequest>,
) -> ApiResult<Json<StatusResponse>> {
    let bbox = request.parse_bbox()?;
    state.engine.remove_region(&bbox).await?;

    Ok(Json(StatusResponse {
        status: "success".to_string(),
    }))
}

/// One region in the list response.
#[derive(Serialize)]
pub struct RegionView {
    pub id: RegionId,
    pub bbox: String,
    pub dwell_seconds: f64,
}

/// Region list response.
#[derive(Serialize)]
pub struct ListRegionsResponse {
    pub regions: Vec<RegionView>,
}

/// List all tracked regions, in insertion order.
pub async fn list_regions(State(state): State<AppState>) -> Json<ListRegionsResponse> {
    let regions = state
        .engine
        .list_regions()
        .into_iter()
        .map(|r| RegionView {
            id: r.id,
            bbox: r.bbox.to_string(),
            dwell_seconds: r.dwell_seconds,
        })
        .collect();

    Json(ListRegionsResponse { regions })
}

/// Dwell timer response.
#[derive(Serialize)]
pub struct TimerResponse {
    pub status: String,
    pub id: RegionId,
    /// Committed dwell time formatted to two decimal places.
    pub timer: String,
}

/// Read the committed dwell time for one region.
pub async fn region_timer(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<TimerResponse>> {
    let id = RegionId(id);
    let seconds = state.engine.region_timer(id)?;

    Ok(Json(TimerResponse {
        status: "success".to_string(),
        id,
        timer: format!("{seconds:.2}"),
    }))
}

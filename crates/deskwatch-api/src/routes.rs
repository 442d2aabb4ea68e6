//! API routes.

use axum::routing::get;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::feeds::{full_feed, grid_feed, region_feed};
use crate::handlers::regions::{add_region, list_regions, region_timer, remove_region};
use crate::handlers::{health, ready};
use crate::middleware::cors_layer;
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let region_routes = Router::new()
        .route(
            "/regions",
            get(list_regions).post(add_region).delete(remove_region),
        )
        .route("/regions/:id/timer", get(region_timer))
        .route("/regions/:id/feed", get(region_feed));

    let feed_routes = Router::new()
        .route("/feed", get(full_feed))
        .route("/feed/grid", get(grid_feed));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    Router::new()
        .nest("/api", region_routes)
        .merge(feed_routes)
        .merge(health_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

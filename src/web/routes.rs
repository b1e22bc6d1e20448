use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::app_state::AppState;

use super::handlers;

pub fn build_router(state: Arc<AppState>) -> Router {
    let tracked_routes = Router::new()
        .route("/", get(handlers::root))
        .route("/status", get(handlers::status))
        .route("/location", get(handlers::location))
        .route("/capture/start", post(handlers::capture_start))
        .route("/capture/end", post(handlers::capture_end))
        .route("/capture/toggle", post(handlers::capture_toggle))
        .route("/capture/snap", post(handlers::capture_snap))
        .route("/capture/data-url", post(handlers::capture_data_url))
        .route("/stream", get(handlers::stream))
        .route("/preview", get(handlers::preview))
        .route("/trees", post(handlers::submit_tree))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            super::middleware::track_activity,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(tracked_routes)
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state)
}

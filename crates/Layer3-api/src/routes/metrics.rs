//! Metrics endpoint

use crate::server::AppState;
use axum::{extract::State, routing::get, Json, Router};
use pdbp_core::MetricsSnapshot;

pub fn metrics_routes() -> Router<AppState> {
    Router::new().route("/api/metrics", get(get_metrics))
}

async fn get_metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.service.get_metrics())
}

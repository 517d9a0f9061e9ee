//! Health check endpoint

use crate::dto::HealthDto;
use crate::server::AppState;
use axum::{routing::get, Json, Router};

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

async fn health_check() -> Json<HealthDto> {
    Json(HealthDto::up())
}

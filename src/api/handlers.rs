use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::cache::StatsCache;

pub struct AppState {
    pub cache: Arc<StatsCache>,
}

/// Serve the statistics of the logs as JSON
pub async fn get_statistics(State(state): State<Arc<AppState>>) -> Response {
    match state.cache.produce_json().await {
        Ok(json) => ([(header::CONTENT_TYPE, "application/json")], json).into_response(),
        Err(e) => {
            tracing::error!("Failed to serve statistics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to parse logs").into_response()
        }
    }
}

pub async fn health_check() -> &'static str {
    "OK"
}

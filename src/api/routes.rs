use axum::{http::Uri, routing::get, Router};
use std::sync::Arc;

use crate::cache::StatsCache;
use crate::config::FrontendConfig;

use super::handlers::{get_statistics, health_check, AppState};
use super::static_files::serve_static;

pub fn create_router(cache: Arc<StatsCache>, frontend: FrontendConfig) -> Router {
    let state = Arc::new(AppState { cache });
    let static_dir = frontend.static_dir;

    Router::new()
        .route("/data", get(get_statistics))
        .route("/health", get(health_check))
        .with_state(state)
        .fallback(move |uri: Uri| {
            let static_dir = static_dir.clone();
            async move { serve_static(uri, static_dir).await }
        })
}

//! HTTP surface integration tests
//!
//! These tests drive the router directly with `tower::ServiceExt::oneshot`.

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use logstat::api::create_router;
use logstat::cache::StatsCache;
use logstat::config::FrontendConfig;
use logstat::error::{PipelineError, PipelineResult};
use logstat::stats::{HostCounter, Statistics, StatsSource};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

struct FixedSource {
    passes: AtomicUsize,
}

#[async_trait]
impl StatsSource for FixedSource {
    async fn collect(&self) -> PipelineResult<Statistics> {
        self.passes.fetch_add(1, Ordering::SeqCst);
        let mut stats = Statistics::new("/var/log/caddy");
        stats.log_lines = 3;
        let mut host = HostCounter::default();
        host.total.requests = 3;
        stats.hosts.insert("example.com".to_string(), host);
        Ok(stats)
    }
}

struct BrokenSource;

#[async_trait]
impl StatsSource for BrokenSource {
    async fn collect(&self) -> PipelineResult<Statistics> {
        Err(PipelineError::SourceUnavailable {
            path: PathBuf::from("/var/log/caddy"),
            reason: "No such file or directory".to_string(),
        })
    }
}

fn router(source: Arc<dyn StatsSource>, frontend: FrontendConfig) -> Router {
    let cache = Arc::new(StatsCache::new(source, Duration::from_secs(60)));
    create_router(cache, frontend)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, body.to_vec())
}

#[tokio::test]
async fn test_data_endpoint_serves_statistics() {
    let source = Arc::new(FixedSource {
        passes: AtomicUsize::new(0),
    });
    let app = router(source.clone(), FrontendConfig::default());

    let (status, content_type, body) = get(app.clone(), "/data").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/json"));

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["logLines"], 3);
    assert_eq!(json["hosts"]["example.com"]["total"]["totalRequests"], 3);

    // Second request is answered from the cache
    let (status, _, second) = get(app, "/data").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, second);
    assert_eq!(source.passes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_data_endpoint_reports_failure() {
    let app = router(Arc::new(BrokenSource), FrontendConfig::default());

    let (status, _, body) = get(app, "/data").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, b"failed to parse logs");
}

#[tokio::test]
async fn test_health_check() {
    let app = router(Arc::new(BrokenSource), FrontendConfig::default());

    let (status, _, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn test_frontend_is_served() {
    let app = router(Arc::new(BrokenSource), FrontendConfig::default());

    let (status, content_type, _) = get(app.clone(), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/html"));

    let (status, _, _) = get(app, "/missing.js").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_static_dir_overrides_embedded_assets() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<p>custom</p>").unwrap();
    let frontend = FrontendConfig {
        static_dir: Some(dir.path().display().to_string()),
    };
    let app = router(Arc::new(BrokenSource), frontend);

    let (status, _, body) = get(app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"<p>custom</p>");
}

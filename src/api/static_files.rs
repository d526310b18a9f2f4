use axum::{
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use mime_guess::from_path;
use rust_embed::RustEmbed;
use std::path::{Component, Path, PathBuf};

#[derive(RustEmbed)]
#[folder = "web/dist"]
pub struct Assets;

/// Serve static files from embedded assets or filesystem
pub async fn serve_static(uri: Uri, static_dir: Option<String>) -> Response {
    let path = uri.path().trim_start_matches('/');
    let path = if path.is_empty() { "index.html" } else { path };

    // Try to serve from filesystem if static_dir is provided
    if let Some(ref dir) = static_dir {
        if is_safe_path(path) {
            let file_path = PathBuf::from(dir).join(path);
            if let Ok(content) = tokio::fs::read(&file_path).await {
                let mime_type = from_path(&file_path).first_or_octet_stream();
                return ([(header::CONTENT_TYPE, mime_type.to_string())], content).into_response();
            }
        }
    }

    // Fall back to embedded assets
    serve_embedded(path)
}

fn serve_embedded(path: &str) -> Response {
    match Assets::get(path) {
        Some(content) => {
            let mime = from_path(path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.to_string())], content.data.into_owned()).into_response()
        }
        None => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
    }
}

/// Only plain relative paths may be resolved against the static directory
fn is_safe_path(path: &str) -> bool {
    Path::new(path)
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
}

//! HTTP side of the waterfall viewer.
//!
//! Two small axum services live here:
//! - a static content server for the browser viewer's files
//!   ([`static_router`], [`run_server`]);
//! - a demo producer that streams synthetic bins over WebSocket
//!   ([`producer::producer_router`], [`producer::run_producer`]).
//!
//! Every static response carries `Cache-Control: no-store`, so a reload
//! always picks up rebuilt viewer files.

pub mod producer;

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::{
    Router,
    extract::{Path as UrlPath, State},
    http::{HeaderValue, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};

/// Where `/` redirects to.
pub const VIEWER_PATH: &str = "/waterfall/";

/// Default static server port, overridable with `PORT`.
pub const DEFAULT_PORT: u16 = 8080;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Shared server state.
struct AppState {
    root: PathBuf,
}

/// Content type by file extension, `application/octet-stream` when unknown.
pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("html") => "text/html; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("png") => "image/png",
        Some("svg") => "image/svg+xml",
        Some("wasm") => "application/wasm",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

/// Map a decoded request path onto a file under `root`.
///
/// A trailing `/` (or an empty path) means `index.html`. `.` and `..` are
/// folded lexically; `None` means the path would climb out of `root`.
pub fn resolve(root: &Path, request_path: &str) -> Option<PathBuf> {
    let mut rel = request_path.trim_start_matches('/').to_string();
    if rel.is_empty() || rel.ends_with('/') {
        rel.push_str("index.html");
    }

    let mut clean = PathBuf::new();
    for component in Path::new(&rel).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !clean.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    let full = root.join(clean);
    full.starts_with(root).then_some(full)
}

fn plain(status: StatusCode, body: &'static str) -> Response {
    (status, [(header::CONTENT_TYPE, TEXT_PLAIN)], body).into_response()
}

async fn handle_root() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, VIEWER_PATH)]).into_response()
}

async fn handle_file(
    State(state): State<Arc<AppState>>,
    UrlPath(path): UrlPath<String>,
) -> Response {
    let Some(mut file) = resolve(&state.root, &path) else {
        log::debug!("refusing path outside root: {path}");
        return plain(StatusCode::FORBIDDEN, "Forbidden");
    };

    if tokio::fs::metadata(&file)
        .await
        .is_ok_and(|meta| meta.is_dir())
    {
        file.push("index.html");
    }

    match tokio::fs::read(&file).await {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, content_type(&file))],
            bytes,
        )
            .into_response(),
        Err(e) => {
            if e.kind() != io::ErrorKind::NotFound {
                log::warn!("failed to read {}: {e}", file.display());
            }
            plain(StatusCode::NOT_FOUND, "Not found")
        }
    }
}

async fn no_store(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

/// Build the static content router for `root`.
pub fn static_router(root: impl Into<PathBuf>) -> Router {
    let state = Arc::new(AppState { root: root.into() });

    Router::new()
        .route("/", get(handle_root))
        .route("/{*path}", get(handle_file))
        .with_state(state)
        .layer(middleware::map_response(no_store))
}

/// Run the static content server until it fails.
pub async fn run_server(root: impl Into<PathBuf>, host: &str, port: u16) -> io::Result<()> {
    let root = root.into();
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    log::info!(
        "serving {} on http://{}",
        root.display(),
        listener.local_addr()?
    );
    axum::serve(listener, static_router(root)).await
}

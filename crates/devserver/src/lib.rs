//! Development server: serves the built site with no-cache headers, injects
//! a live-reload client into HTML, and pushes rebuild events over `/ws`.

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State, WebSocketUpgrade},
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use pipeline::{build_site, page_index, BuildContext};
use search::LiveFilter;
use serde::Deserialize;
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{DevEvent, PageSummary, SearchResponse},
};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

mod watcher;

pub use watcher::spawn_watcher;

const LIVE_RELOAD_SCRIPT: &str = r#"<script>
(function () {
  var proto = location.protocol === "https:" ? "wss://" : "ws://";
  var socket = new WebSocket(proto + location.host + "/ws");
  socket.onmessage = function (msg) {
    var event;
    try { event = JSON.parse(msg.data); } catch (_) { return; }
    if (event.type === "reload") { location.reload(); }
    if (event.type === "build_failed") { console.error("build failed:", event.payload.message); }
  };
})();
</script>"#;

#[derive(Clone)]
pub struct AppState {
    public_dir: PathBuf,
    events: broadcast::Sender<DevEvent>,
    index: Arc<RwLock<Vec<PageSummary>>>,
}

impl AppState {
    pub fn new(
        public_dir: PathBuf,
        events: broadcast::Sender<DevEvent>,
        index: Arc<RwLock<Vec<PageSummary>>>,
    ) -> Self {
        Self {
            public_dir,
            events,
            index,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

#[derive(Debug, Error)]
enum ServeError {
    #[error("file not found")]
    NotFound,
    #[error("invalid request path")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Builds the site, then serves it with file watching until shut down.
pub async fn run(root: PathBuf, port_override: Option<u16>) -> Result<()> {
    let ctx = BuildContext::load(root.clone())?;
    let report = build_site(&ctx)?;
    info!(pages = report.rendered.len(), "initial build complete");

    let (events, _) = broadcast::channel(64);
    let index = Arc::new(RwLock::new(page_index(&ctx)?));
    let state = AppState::new(ctx.public_dir(), events.clone(), Arc::clone(&index));

    // The debouncer stops watching when dropped; hold it for the server's
    // lifetime.
    let _watcher = spawn_watcher(root, events, index)?;

    let mut addr: SocketAddr = ctx
        .settings
        .dev_bind
        .parse()
        .with_context(|| format!("invalid dev_bind '{}'", ctx.settings.dev_bind))?;
    if let Some(port) = port_override {
        addr.set_port(port);
    }

    let listener = bind_available(addr).await?;
    info!(addr = %listener.local_addr()?, "dev server listening");
    axum::serve(listener, build_router(Arc::new(state))).await?;
    Ok(())
}

/// Binds `addr`, scanning upward from its port when it is already taken.
async fn bind_available(addr: SocketAddr) -> Result<tokio::net::TcpListener> {
    let mut candidate = addr;
    loop {
        match tokio::net::TcpListener::bind(candidate).await {
            Ok(listener) => return Ok(listener),
            Err(err) => {
                warn!(port = candidate.port(), %err, "port unavailable; trying the next one");
                let next = candidate
                    .port()
                    .checked_add(1)
                    .with_context(|| format!("no available port above {}", addr.port()))?;
                candidate.set_port(next);
            }
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/search", get(api_search))
        .route("/ws", get(ws_handler))
        .fallback(serve_page)
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

/// Runs the live filter over the page index, exactly as the in-page search
/// box filters the rendered list.
async fn api_search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, (StatusCode, Json<ApiError>)> {
    let query = params.q.ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(
                ErrorCode::Validation,
                "missing query parameter 'q'",
            )),
        )
    })?;

    let pages = state
        .index
        .read()
        .map_err(|_| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::new(ErrorCode::Internal, "page index unavailable")),
            )
        })?
        .clone();

    let mut filter = LiveFilter::new(pages.iter().map(|page| page.title.clone()));
    filter.apply(&query);
    let visible = pages
        .into_iter()
        .zip(filter.items())
        .filter(|(_, item)| item.is_visible())
        .map(|(page, _)| page)
        .collect();

    Ok(Json(SearchResponse {
        query,
        pages: visible,
    }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_connection(state, socket))
}

async fn ws_connection(state: Arc<AppState>, socket: axum::extract::ws::WebSocket) {
    use axum::extract::ws::Message;
    use futures::{SinkExt, StreamExt};

    let (mut sender, mut receiver) = socket.split();
    let mut events_rx = state.events.subscribe();

    let send_task = tokio::spawn(async move {
        while let Ok(event) = events_rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(v) => v,
                Err(_) => continue,
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(_msg)) = receiver.next().await {}

    send_task.abort();
}

async fn serve_page(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    match load_file(&state.public_dir, uri.path()).await {
        Ok((path, bytes)) => {
            let mut headers = no_cache_headers();
            let mime = content_type_for(&path);
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(mime));

            let body = if mime.starts_with("text/html") {
                inject_reload_script(String::from_utf8_lossy(&bytes).into_owned()).into_bytes()
            } else {
                bytes
            };
            (StatusCode::OK, headers, body).into_response()
        }
        Err(ServeError::NotFound) => (StatusCode::NOT_FOUND, "File not found").into_response(),
        Err(ServeError::InvalidPath) => {
            (StatusCode::BAD_REQUEST, "invalid request path").into_response()
        }
        Err(ServeError::Io(err)) => {
            error!(%err, path = uri.path(), "failed to read file");
            (StatusCode::INTERNAL_SERVER_ERROR, "read error").into_response()
        }
    }
}

async fn load_file(public_dir: &Path, request_path: &str) -> Result<(PathBuf, Vec<u8>), ServeError> {
    let trimmed = request_path.trim_matches('/');
    if trimmed.split('/').any(|segment| segment == "..") {
        return Err(ServeError::InvalidPath);
    }

    let path = resolve_request(public_dir, trimmed).ok_or(ServeError::NotFound)?;
    let bytes = tokio::fs::read(&path).await?;
    Ok((path, bytes))
}

/// Resolution order of the original dev server: exact file, then
/// `<path>.html`, then the `index.html` fallback.
fn resolve_request(public_dir: &Path, path: &str) -> Option<PathBuf> {
    if !path.is_empty() {
        let exact = public_dir.join(path);
        if exact.is_file() {
            return Some(exact);
        }
        let with_ext = public_dir.join(format!("{path}.html"));
        if with_ext.is_file() {
            return Some(with_ext);
        }
    }
    let index = public_dir.join("index.html");
    index.is_file().then_some(index)
}

fn no_cache_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    headers
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
    {
        "html" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "xml" => "application/xml",
        "txt" => "text/plain; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}

/// Inserts the reload client before `</body>`, or appends it when the page
/// has no closing body tag.
fn inject_reload_script(mut html: String) -> String {
    let needle = b"</body>";
    let bytes = html.as_bytes();
    let pos = (0..bytes.len().saturating_sub(needle.len() - 1))
        .rev()
        .find(|&i| bytes[i..i + needle.len()].eq_ignore_ascii_case(needle));
    match pos {
        Some(i) => html.insert_str(i, LIVE_RELOAD_SCRIPT),
        None => html.push_str(LIVE_RELOAD_SCRIPT),
    }
    html
}

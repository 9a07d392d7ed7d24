//! HTTP routes
//!
//! The streaming endpoint hands each request to a [`StreamSession`]; the
//! remaining endpoints read the log directory directly.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, Path, Request, State};
use axum::http::header;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::stream::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use super::config::ServerConfig;
use super::error::HttpError;
use crate::broadcast::Broadcaster;
use crate::error::SessionError;
use crate::session::{event_text, StreamSession};
use crate::stats::{ServerStats, SessionCounters};
use crate::watch::LogFilter;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub filter: LogFilter,
    pub broadcaster: Broadcaster,
    pub sessions: Arc<SessionCounters>,
    /// Bounds concurrent stream sessions when `max_connections > 0`
    pub connection_semaphore: Option<Arc<Semaphore>>,
    /// Parent of every session's cancellation token
    pub shutdown: CancellationToken,
}

impl AppState {
    /// State with fresh counters over `broadcaster`
    pub fn new(config: ServerConfig, broadcaster: Broadcaster) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            filter: config.filter(),
            config: Arc::new(config),
            broadcaster,
            sessions: Arc::new(SessionCounters::new()),
            connection_semaphore,
            shutdown: CancellationToken::new(),
        }
    }

    /// Use `shutdown` as the parent of session tokens
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Reserve a stream slot, if a limit is configured
    fn acquire_slot(&self) -> Result<Option<OwnedSemaphorePermit>, SessionError> {
        match &self.connection_semaphore {
            Some(sem) => Arc::clone(sem)
                .try_acquire_owned()
                .map(Some)
                .map_err(|_| SessionError::TooManySessions),
            None => Ok(None),
        }
    }
}

/// Build the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/files", get(list_files))
        .route("/api/download/{filename}", get(download_file))
        .route("/api/logs/{filename}", get(stream_log))
        .route("/api/stats", get(stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Counts an open stream until the response body is dropped
struct SessionGuard {
    counters: Arc<SessionCounters>,
    _permit: Option<OwnedSemaphorePermit>,
}

impl SessionGuard {
    fn new(counters: Arc<SessionCounters>, permit: Option<OwnedSemaphorePermit>) -> Self {
        counters.session_opened();
        Self {
            counters,
            _permit: permit,
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.counters.session_closed();
    }
}

#[derive(Serialize)]
struct FileList {
    files: Vec<String>,
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn list_files(State(state): State<AppState>) -> Result<Json<FileList>, HttpError> {
    let dir = &state.config.log_dir;
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
        HttpError::Internal(format!("cannot read {}: {}", dir.display(), e))
    })?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| HttpError::Internal(e.to_string()))?
    {
        let is_file = entry
            .file_type()
            .await
            .map(|t| t.is_file())
            .unwrap_or(false);
        if !is_file {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if state.filter.matches(name) {
                files.push(name.to_string());
            }
        }
    }
    files.sort();

    Ok(Json(FileList { files }))
}

async fn download_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    state.filter.validate(&filename)?;

    let file = tokio::fs::File::open(state.config.log_dir.join(&filename)).await?;
    if !file.metadata().await?.is_file() {
        return Err(HttpError::NotFound(filename));
    }
    let body = Body::from_stream(ReaderStream::new(file));
    let headers = [
        (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
    ];
    Ok((headers, body))
}

async fn stream_log(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    request: Request,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, HttpError> {
    state.filter.validate(&filename)?;
    let permit = state.acquire_slot().inspect_err(|_| {
        tracing::warn!(file = %filename, "Stream rejected: limit reached");
    })?;

    let mut session = StreamSession::open(
        Arc::clone(state.broadcaster.registry()),
        &state.filter,
        &filename,
        state.shutdown.child_token(),
    )?;
    if let Some(ConnectInfo(peer)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        session.set_peer(*peer);
    }

    let guard = SessionGuard::new(Arc::clone(&state.sessions), permit);
    let events = session.into_stream().map(move |line| {
        let _open = &guard;
        Ok::<_, Infallible>(Event::default().data(event_text(&line)))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(state.config.keep_alive_interval)))
}

async fn stats(State(state): State<AppState>) -> Json<ServerStats> {
    let registry = state.broadcaster.registry();
    Json(ServerStats::collect(
        &state.sessions,
        state.broadcaster.stats(),
        registry.file_counts(),
    ))
}

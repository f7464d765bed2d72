//! HTTP surface and service lifecycle.
//!
//! Two routes: `/render` serves cached or freshly rendered HTML with an
//! `X-Prerender-Cache: HIT|MISS` header, and `/health` answers `OK` no matter
//! what state the cache or browser is in. [`run`] owns the listener and the
//! browser lifetime: it pre-warms the browser after binding and closes it
//! after a termination signal drains the listener.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::browser::BrowserManager;
use crate::cache::RenderCache;
use crate::error::{PrerenderError, Result};
use crate::render::Render;

/// Response header carrying the cache status of a rendered document.
pub const CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-prerender-cache");

/// Whether a response was served from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// Shared state behind the render endpoint.
#[derive(Clone)]
pub struct AppState {
    cache: Arc<RenderCache>,
    renderer: Arc<dyn Render>,
}

impl AppState {
    pub fn new(cache: Arc<RenderCache>, renderer: Arc<dyn Render>) -> Self {
        Self { cache, renderer }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/render", get(render_page))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Deserialize)]
struct RenderQuery {
    url: Option<String>,
}

async fn render_page(
    State(state): State<AppState>,
    Query(query): Query<RenderQuery>,
) -> Response {
    match handle_render(&state, query.url.as_deref()).await {
        Ok((html, status)) => {
            ([(CACHE_STATUS_HEADER, status.as_str())], html).into_response()
        }
        Err(e) => error_response(&e),
    }
}

async fn handle_render(state: &AppState, url: Option<&str>) -> Result<(String, CacheStatus)> {
    let url = url
        .filter(|u| !u.is_empty())
        .ok_or(PrerenderError::MissingParameter)?;
    // Reject malformed input before touching the cache or the browser.
    let parsed = url::Url::parse(url)?;
    if !parsed.has_host() {
        return Err(PrerenderError::InvalidUrl(url::ParseError::EmptyHost));
    }

    if let Some(html) = state.cache.get(url) {
        info!(url, "cache hit");
        return Ok((html, CacheStatus::Hit));
    }

    info!(url, "rendering");
    let html = state.renderer.render(url).await?;
    state.cache.insert(url.to_string(), html.clone());
    Ok((html, CacheStatus::Miss))
}

fn error_response(error: &PrerenderError) -> Response {
    let status = error.status_code();
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(error = %error, "render request failed");
    }
    (status, error.public_message().to_string()).into_response()
}

/// Bind, pre-warm the browser, serve until a termination signal, then close
/// the browser so no Chromium process outlives the service.
pub async fn run(addr: SocketAddr, state: AppState, manager: Arc<BrowserManager>) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "prerender server listening");

    // Begin the launch now so the first bot request does not pay the full
    // startup cost. The endpoint accepts traffic either way; early requests
    // join this launch through the manager's in-flight guard.
    let prewarm = Arc::clone(&manager);
    tokio::spawn(async move {
        if let Err(e) = prewarm.acquire().await {
            error!(error = %e, "browser pre-warm failed");
        }
    });

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    manager.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let interrupt = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
}

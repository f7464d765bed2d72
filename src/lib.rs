//! Prerender Service Library
//!
//! A server-side rendering proxy for web crawlers: pages are rendered in a
//! shared headless Chromium process until network activity settles, and the
//! resulting static HTML is served from a bounded, time-expiring cache.
//!
//! # Module Overview
//!
//! - [`browser`] - Chromium lifecycle: lazy singleton launch, shared launch
//!   guard, shutdown
//! - [`render`] - per-request page rendering with resource filtering and
//!   network-idle detection
//! - [`cache`] - LRU + TTL store of rendered documents
//! - [`server`] - HTTP endpoint (`/render`, `/health`) and lifecycle wiring
//! - [`config`] - configuration file support
//! - [`error`] - error types and their HTTP mapping
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use prerender_lib::{
//!     AppState, BrowserManager, BrowserSettings, PageRenderer, RenderCache, RenderOptions,
//! };
//!
//! # async fn example() -> prerender_lib::Result<()> {
//! let cache = Arc::new(RenderCache::default());
//! let manager = Arc::new(BrowserManager::new(BrowserSettings::default()));
//! let renderer = Arc::new(PageRenderer::new(Arc::clone(&manager), RenderOptions::default()));
//!
//! let state = AppState::new(cache, renderer);
//! prerender_lib::server::run("0.0.0.0:3000".parse().unwrap(), state, manager).await?;
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod cache;
pub mod config;
pub mod error;
pub mod render;
pub mod server;

pub use browser::{BrowserHandle, BrowserManager, BrowserSettings};
pub use cache::{RenderCache, DEFAULT_MAX_ENTRIES, DEFAULT_TTL};
pub use config::{Config, DEFAULT_PORT};
pub use error::{PrerenderError, Result};
pub use render::{
    PageRenderer, Render, RenderOptions, ResourcePolicy, DEFAULT_NAVIGATION_TIMEOUT,
    DEFAULT_USER_AGENT, IDLE_MAX_INFLIGHT, IDLE_WINDOW,
};
pub use server::{router, AppState, CacheStatus, CACHE_STATUS_HEADER};

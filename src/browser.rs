//! Browser lifecycle management.
//!
//! One Chromium process serves the whole service. [`BrowserManager::acquire`]
//! launches it lazily and hands out cloneable [`BrowserHandle`]s; concurrent
//! callers that arrive while a launch is still in flight all await the same
//! shared launch future instead of spawning extra processes. A failed launch
//! reaches every waiter, caches nothing, and the next `acquire` retries.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::future::{BoxFuture, Shared};
use futures::{FutureExt, StreamExt};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{PrerenderError, Result};

/// Chromium flags suited to constrained server environments (containers,
/// small VPS instances).
const LAUNCH_ARGS: [&str; 4] = [
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-accelerated-2d-canvas",
    "--disable-gpu",
];

#[derive(Debug, Clone, Default)]
pub struct BrowserSettings {
    /// Explicit Chromium/Chrome binary; auto-detected when `None`.
    pub executable: Option<PathBuf>,
}

/// Cloneable handle to the single shared Chromium process.
///
/// The handle only borrows the browser for page creation; ownership stays
/// with the [`BrowserManager`], which closes it exactly once on shutdown.
#[derive(Debug, Clone)]
pub struct BrowserHandle {
    browser: Arc<AsyncMutex<Browser>>,
    event_loop: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl BrowserHandle {
    /// Open a fresh, isolated page. Pages are never shared across requests;
    /// the caller is responsible for closing the page it opened.
    pub async fn new_page(&self) -> std::result::Result<Page, chromiumoxide::error::CdpError> {
        let browser = self.browser.lock().await;
        browser.new_page("about:blank").await
    }

    async fn close(&self) {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            warn!(error = %e, "browser close command failed");
        }
        if let Err(e) = browser.wait().await {
            warn!(error = %e, "waiting for browser exit failed");
        }
        let event_loop = self.event_loop.lock().unwrap().take();
        if let Some(task) = event_loop {
            let _ = task.await;
        }
    }
}

/// Outcome of the shared launch future. Cloned to every concurrent waiter,
/// so the error side has to be cloneable too.
type LaunchResult = std::result::Result<BrowserHandle, LaunchFailure>;

type LaunchFuture = Shared<BoxFuture<'static, LaunchResult>>;

#[derive(Debug, Clone)]
struct LaunchFailure(String);

#[derive(Default)]
struct ManagerState {
    ready: Option<BrowserHandle>,
    pending: Option<LaunchFuture>,
}

/// Owns the process-wide browser. At most one live browser exists at any
/// time; all concurrent page sessions share it.
pub struct BrowserManager {
    settings: BrowserSettings,
    state: Arc<Mutex<ManagerState>>,
}

impl BrowserManager {
    pub fn new(settings: BrowserSettings) -> Self {
        Self {
            settings,
            state: Arc::new(Mutex::new(ManagerState::default())),
        }
    }

    /// Obtain the shared browser handle, launching the process on first use.
    ///
    /// Idempotent: once a launch has succeeded, every call returns the same
    /// handle until [`shutdown`](Self::shutdown).
    pub async fn acquire(&self) -> Result<BrowserHandle> {
        let launch = {
            let mut state = self.state.lock().unwrap();
            if let Some(handle) = &state.ready {
                return Ok(handle.clone());
            }
            match &state.pending {
                Some(pending) => pending.clone(),
                None => {
                    let pending =
                        Self::launch_shared(self.settings.clone(), Arc::clone(&self.state));
                    state.pending = Some(pending.clone());
                    pending
                }
            }
        };
        launch
            .await
            .map_err(|LaunchFailure(message)| PrerenderError::Launch(message))
    }

    fn launch_shared(settings: BrowserSettings, state: Arc<Mutex<ManagerState>>) -> LaunchFuture {
        async move {
            let result = launch_browser(&settings).await;
            let mut state = state.lock().unwrap();
            state.pending = None;
            match result {
                Ok(handle) => {
                    state.ready = Some(handle.clone());
                    Ok(handle)
                }
                Err(e) => Err(LaunchFailure(e.to_string())),
            }
        }
        .boxed()
        .shared()
    }

    /// Close the browser if one was launched. Any launch still in flight is
    /// forgotten; its waiters finish on their own.
    pub async fn shutdown(&self) {
        let handle = {
            let mut state = self.state.lock().unwrap();
            state.pending = None;
            state.ready.take()
        };
        if let Some(handle) = handle {
            info!("closing browser");
            handle.close().await;
        }
    }
}

async fn launch_browser(settings: &BrowserSettings) -> Result<BrowserHandle> {
    info!(executable = ?settings.executable, "launching browser");

    let mut builder = BrowserConfig::builder().no_sandbox();
    for arg in LAUNCH_ARGS {
        builder = builder.arg(arg);
    }
    if let Some(path) = &settings.executable {
        builder = builder.chrome_executable(path);
    }
    let config = builder.build().map_err(PrerenderError::Launch)?;

    let (browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|e| PrerenderError::Launch(e.to_string()))?;

    // The handler drives all CDP traffic; it runs until the websocket to the
    // browser closes.
    let event_loop = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                break;
            }
        }
        debug!("browser event loop ended");
    });

    info!("browser launched");
    Ok(BrowserHandle {
        browser: Arc::new(AsyncMutex::new(browser)),
        event_loop: Arc::new(Mutex::new(Some(event_loop))),
    })
}

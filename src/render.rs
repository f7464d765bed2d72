//! Per-request page rendering against the shared browser.
//!
//! A render opens a fresh page, installs the outbound resource filter, sets
//! the service user agent, navigates until the network calms down, and
//! serializes the resulting DOM. The page is closed on every exit path.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams as FetchEnableParams, EventRequestPaused,
    FailRequestParams,
};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, ErrorReason, EventLoadingFailed, EventLoadingFinished,
    EventRequestWillBeSent, RequestId, ResourceType,
};
use chromiumoxide::Page;
use futures::future::BoxFuture;
use futures::stream::{self, Stream};
use futures::{FutureExt, StreamExt};
use tokio::time::{sleep_until, timeout, Instant};
use tracing::{debug, info, warn};

use crate::browser::{BrowserHandle, BrowserManager};
use crate::error::{PrerenderError, Result};

/// Hard budget for navigation plus network settling.
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Outbound user agent identifying this service to the target site.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; PrerenderBot/1.0)";

/// Navigation counts as settled once at most this many requests stay in
/// flight for [`IDLE_WINDOW`].
pub const IDLE_MAX_INFLIGHT: usize = 2;

/// Quiet window that must elapse before the network is considered idle. The
/// window restarts on any network activity.
pub const IDLE_WINDOW: Duration = Duration::from_millis(500);

/// Declarative allow/deny decision per outbound resource category.
///
/// The default policy aborts image, media, and font requests before they
/// leave the page; documents, scripts, stylesheets, and XHR/fetch proceed,
/// since client frameworks need them to finish rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourcePolicy {
    blocked: Vec<ResourceType>,
}

impl Default for ResourcePolicy {
    fn default() -> Self {
        Self {
            blocked: vec![ResourceType::Image, ResourceType::Media, ResourceType::Font],
        }
    }
}

impl ResourcePolicy {
    pub fn blocking(blocked: Vec<ResourceType>) -> Self {
        Self { blocked }
    }

    /// Whether a request of this resource type may leave the page.
    pub fn allows(&self, resource_type: &ResourceType) -> bool {
        !self.blocked.contains(resource_type)
    }
}

/// Rendering seam the HTTP endpoint depends on. The production impl is
/// [`PageRenderer`]; tests substitute stubs.
pub trait Render: Send + Sync + 'static {
    /// Render `url` to a fully serialized HTML document.
    fn render<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String>>;
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub user_agent: String,
    pub navigation_timeout: Duration,
    pub policy: ResourcePolicy,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            policy: ResourcePolicy::default(),
        }
    }
}

/// Renders URLs on pages obtained from the shared browser.
pub struct PageRenderer {
    manager: Arc<BrowserManager>,
    options: RenderOptions,
}

impl PageRenderer {
    pub fn new(manager: Arc<BrowserManager>, options: RenderOptions) -> Self {
        Self { manager, options }
    }

    /// Render `url` on a fresh page of the given browser.
    ///
    /// The page is closed before this returns, on success and on every
    /// failure path alike.
    pub async fn render_page(&self, browser: &BrowserHandle, url: &str) -> Result<String> {
        let started = Instant::now();
        let page = browser
            .new_page()
            .await
            .map_err(|e| PrerenderError::render(url, e))?;

        let outcome = self.render_on(&page, url).await;

        if let Err(e) = page.close().await {
            warn!(url, error = %e, "failed to close page");
        }

        match &outcome {
            Ok(html) => info!(
                url,
                bytes = html.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "render done"
            ),
            Err(e) => warn!(url, error = %e, "render failed"),
        }
        outcome
    }

    async fn render_on(&self, page: &Page, url: &str) -> Result<String> {
        self.install_request_filter(page, url).await?;

        page.set_user_agent(self.options.user_agent.as_str())
            .await
            .map_err(|e| PrerenderError::render(url, e))?;

        // Listeners must exist before navigation so the document request
        // itself is counted as in flight.
        page.execute(NetworkEnableParams::default())
            .await
            .map_err(|e| PrerenderError::render(url, e))?;
        let sent = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(|e| PrerenderError::render(url, e))?;
        let finished = page
            .event_listener::<EventLoadingFinished>()
            .await
            .map_err(|e| PrerenderError::render(url, e))?;
        let failed = page
            .event_listener::<EventLoadingFailed>()
            .await
            .map_err(|e| PrerenderError::render(url, e))?;
        let activity = stream::select(
            sent.map(|event| NetworkActivity::Started(event.request_id.clone())),
            stream::select(
                finished.map(|event| NetworkActivity::Settled(event.request_id.clone())),
                failed.map(|event| NetworkActivity::Settled(event.request_id.clone())),
            ),
        );

        let navigation = async {
            page.goto(url)
                .await
                .map_err(|e| PrerenderError::render(url, e))?;
            wait_for_network_idle(activity, IDLE_MAX_INFLIGHT, IDLE_WINDOW).await;
            Ok::<(), PrerenderError>(())
        };
        match timeout(self.options.navigation_timeout, navigation).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(PrerenderError::RenderTimeout {
                    url: url.to_string(),
                    timeout: self.options.navigation_timeout,
                })
            }
        }

        page.content()
            .await
            .map_err(|e| PrerenderError::render(url, e))
    }

    /// Pause every outbound request and continue or abort it according to
    /// the resource policy. The forwarding task ends when the page closes.
    async fn install_request_filter(&self, page: &Page, url: &str) -> Result<()> {
        let mut paused = page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(|e| PrerenderError::render(url, e))?;

        let policy = self.options.policy.clone();
        let interceptor = page.clone();
        tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let request_id = event.request_id.clone();
                let command = if policy.allows(&event.resource_type) {
                    interceptor
                        .execute(ContinueRequestParams::new(request_id))
                        .await
                        .map(|_| ())
                } else {
                    interceptor
                        .execute(FailRequestParams::new(request_id, ErrorReason::Aborted))
                        .await
                        .map(|_| ())
                };
                if let Err(e) = command {
                    debug!(error = %e, "request interception command failed");
                }
            }
        });

        page.execute(FetchEnableParams::default())
            .await
            .map_err(|e| PrerenderError::render(url, e))?;
        Ok(())
    }
}

impl Render for PageRenderer {
    fn render<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String>> {
        async move {
            let browser = self.manager.acquire().await?;
            self.render_page(&browser, url).await
        }
        .boxed()
    }
}

enum NetworkActivity {
    Started(RequestId),
    Settled(RequestId),
}

/// Resolve once at most `max_inflight` requests have been in flight for a
/// full `window`, or when the activity stream ends (page closed).
async fn wait_for_network_idle<S>(mut activity: S, max_inflight: usize, window: Duration)
where
    S: Stream<Item = NetworkActivity> + Unpin,
{
    let mut inflight: HashSet<RequestId> = HashSet::new();
    let mut deadline = Instant::now() + window;
    loop {
        tokio::select! {
            _ = sleep_until(deadline), if inflight.len() <= max_inflight => return,
            event = activity.next() => match event {
                Some(NetworkActivity::Started(id)) => {
                    inflight.insert(id);
                    deadline = Instant::now() + window;
                }
                Some(NetworkActivity::Settled(id)) => {
                    inflight.remove(&id);
                    deadline = Instant::now() + window;
                }
                None => return,
            },
        }
    }
}

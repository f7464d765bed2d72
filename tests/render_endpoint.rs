//! Black-box tests of the render endpoint over a real listener, with the
//! expensive browser dependency replaced by a stub renderer.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use prerender_lib::{AppState, PrerenderError, Render, RenderCache};

/// Renders a deterministic document per URL; URLs containing "fail" error
/// out. Counts how often the render path was actually taken.
struct StubRenderer {
    calls: AtomicUsize,
}

impl StubRenderer {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Render for StubRenderer {
    fn render<'a>(&'a self, url: &'a str) -> BoxFuture<'a, prerender_lib::Result<String>> {
        async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if url.contains("fail") {
                Err(PrerenderError::render(url, "stubbed navigation error"))
            } else {
                Ok(format!("<html><body>rendered {url}</body></html>"))
            }
        }
        .boxed()
    }
}

async fn spawn_app(cache: Arc<RenderCache>, renderer: Arc<StubRenderer>) -> SocketAddr {
    let app = prerender_lib::router(AppState::new(cache, renderer));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    addr
}

fn render_url(addr: SocketAddr, target: &str) -> String {
    format!("http://{addr}/render?url={target}")
}

#[tokio::test]
async fn miss_then_hit_with_byte_identical_body() {
    let renderer = StubRenderer::new();
    let addr = spawn_app(Arc::new(RenderCache::default()), Arc::clone(&renderer)).await;

    let first = reqwest::get(render_url(addr, "https://example.com/a"))
        .await
        .expect("first request");
    assert_eq!(first.status(), 200);
    assert_eq!(
        first.headers().get("x-prerender-cache").unwrap(),
        "MISS"
    );
    let first_body = first.text().await.expect("body");
    assert!(first_body.contains("https://example.com/a"));

    let second = reqwest::get(render_url(addr, "https://example.com/a"))
        .await
        .expect("second request");
    assert_eq!(second.status(), 200);
    assert_eq!(
        second.headers().get("x-prerender-cache").unwrap(),
        "HIT"
    );
    assert_eq!(second.text().await.expect("body"), first_body);

    assert_eq!(renderer.calls(), 1, "the hit must not render again");
}

#[tokio::test]
async fn expired_entry_is_rendered_again() {
    let renderer = StubRenderer::new();
    let cache = Arc::new(RenderCache::new(10, Duration::from_millis(50)));
    let addr = spawn_app(cache, Arc::clone(&renderer)).await;

    let first = reqwest::get(render_url(addr, "https://example.com/ttl"))
        .await
        .expect("first request");
    assert_eq!(first.headers().get("x-prerender-cache").unwrap(), "MISS");

    tokio::time::sleep(Duration::from_millis(80)).await;

    let second = reqwest::get(render_url(addr, "https://example.com/ttl"))
        .await
        .expect("second request");
    assert_eq!(second.headers().get("x-prerender-cache").unwrap(), "MISS");
    assert_eq!(renderer.calls(), 2);
}

#[tokio::test]
async fn missing_url_parameter_is_rejected_before_any_work() {
    let renderer = StubRenderer::new();
    let addr = spawn_app(Arc::new(RenderCache::default()), Arc::clone(&renderer)).await;

    let response = reqwest::get(format!("http://{addr}/render"))
        .await
        .expect("request");
    assert_eq!(response.status(), 400);
    assert_eq!(
        response.text().await.expect("body"),
        "Missing \"url\" query parameter"
    );
    assert_eq!(renderer.calls(), 0);
}

#[tokio::test]
async fn empty_and_malformed_urls_are_rejected() {
    let renderer = StubRenderer::new();
    let addr = spawn_app(Arc::new(RenderCache::default()), Arc::clone(&renderer)).await;

    let empty = reqwest::get(format!("http://{addr}/render?url="))
        .await
        .expect("request");
    assert_eq!(empty.status(), 400);

    let relative = reqwest::get(render_url(addr, "/just/a/path"))
        .await
        .expect("request");
    assert_eq!(relative.status(), 400);

    assert_eq!(renderer.calls(), 0);
}

#[tokio::test]
async fn render_failure_returns_500_and_leaves_cache_untouched() {
    let renderer = StubRenderer::new();
    let cache = Arc::new(RenderCache::default());
    let addr = spawn_app(Arc::clone(&cache), Arc::clone(&renderer)).await;

    let response = reqwest::get(render_url(addr, "https://example.com/fail"))
        .await
        .expect("request");
    assert_eq!(response.status(), 500);
    assert_eq!(response.text().await.expect("body"), "Failed to render page");
    assert!(cache.is_empty());

    // The failure is not sticky: the same URL is retried on the next request.
    let retry = reqwest::get(render_url(addr, "https://example.com/fail"))
        .await
        .expect("request");
    assert_eq!(retry.status(), 500);
    assert_eq!(renderer.calls(), 2);
}

#[tokio::test]
async fn one_failing_url_does_not_affect_concurrent_requests() {
    let renderer = StubRenderer::new();
    let addr = spawn_app(Arc::new(RenderCache::default()), Arc::clone(&renderer)).await;

    let (bad, good) = tokio::join!(
        reqwest::get(render_url(addr, "https://example.com/fail")),
        reqwest::get(render_url(addr, "https://example.com/good")),
    );

    assert_eq!(bad.expect("bad request").status(), 500);
    let good = good.expect("good request");
    assert_eq!(good.status(), 200);
    assert!(good.text().await.expect("body").contains("/good"));
}

#[tokio::test]
async fn health_stays_up_independent_of_render_state() {
    let renderer = StubRenderer::new();
    let addr = spawn_app(Arc::new(RenderCache::default()), Arc::clone(&renderer)).await;

    // Provoke a render failure first; the probe must not care.
    let _ = reqwest::get(render_url(addr, "https://example.com/fail")).await;

    let response = reqwest::get(format!("http://{addr}/health"))
        .await
        .expect("request");
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.expect("body"), "OK");
}

#[tokio::test]
async fn distinct_urls_cache_independently() {
    let renderer = StubRenderer::new();
    let addr = spawn_app(Arc::new(RenderCache::default()), Arc::clone(&renderer)).await;

    let a = reqwest::get(render_url(addr, "https://example.com/a"))
        .await
        .expect("request");
    let b = reqwest::get(render_url(addr, "https://example.com/b"))
        .await
        .expect("request");
    assert_eq!(a.headers().get("x-prerender-cache").unwrap(), "MISS");
    assert_eq!(b.headers().get("x-prerender-cache").unwrap(), "MISS");

    let a_again = reqwest::get(render_url(addr, "https://example.com/a"))
        .await
        .expect("request");
    assert_eq!(a_again.headers().get("x-prerender-cache").unwrap(), "HIT");
    assert_eq!(renderer.calls(), 2);
}

//! Bounded, time-expiring cache of rendered HTML documents.
//!
//! Keys are the exact request URLs (no normalization); values are whole
//! rendered documents. The cache evicts the least-recently-used entry once
//! `max_entries` is reached, and every entry expires `ttl` after insertion
//! regardless of how often it is read. Nothing is persisted across restarts.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

/// Default maximum number of cached documents.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Default time-to-live of a cached document, measured from insertion.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

struct CacheEntry {
    html: String,
    inserted_at: Instant,
}

/// Thread-safe LRU + TTL store for rendered pages.
///
/// All methods take `&self`; the recency bump, expiry check, and eviction
/// happen under one lock, so each operation is atomic from the caller's
/// point of view.
pub struct RenderCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl RenderCache {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Look up a rendered document. A fresh entry has its recency refreshed;
    /// an expired entry is dropped and reported as absent.
    pub fn get(&self, url: &str) -> Option<String> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(url) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => Some(entry.html.clone()),
            Some(_) => {
                entries.pop(url);
                None
            }
            None => None,
        }
    }

    /// Store a rendered document, evicting the least-recently-used entry if
    /// the cache is full. The TTL clock starts now, even when overwriting.
    pub fn insert(&self, url: String, html: String) {
        let mut entries = self.entries.lock().unwrap();
        entries.put(
            url,
            CacheEntry {
                html,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RenderCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, DEFAULT_TTL)
    }
}

use std::{
    num::NonZeroUsize,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use dashmap::{DashMap, mapref::entry::Entry};
use lru::LruCache;
use tokio::sync::RwLock;

/// Rendered pages keyed by request path. Entries older than `max_age` are
/// still served but reported as stale so the caller can regenerate them.
/// At most `capacity` pages are kept; the least recently used is evicted.
#[derive(Clone)]
pub struct PageCache {
    entries: Arc<RwLock<LruCache<String, CachedPage>>>,
    regenerating: Arc<DashMap<String, ()>>,
    max_age: Duration,
}

#[derive(Clone)]
pub struct CachedPage {
    body: Bytes,
    generated_at: Instant,
}

pub enum Lookup {
    Fresh(CachedPage),
    Stale(CachedPage),
    Missing,
}

impl PageCache {
    pub fn new(max_age: Duration, capacity: NonZeroUsize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(LruCache::new(capacity))),
            regenerating: Arc::new(DashMap::new()),
            max_age,
        }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub async fn get(&self, key: &str) -> Lookup {
        // Write lock: a hit promotes the entry in the LRU order.
        let mut guard = self.entries.write().await;
        match guard.get(key) {
            Some(page) if page.age() < self.max_age => Lookup::Fresh(page.clone()),
            Some(page) => Lookup::Stale(page.clone()),
            None => Lookup::Missing,
        }
    }

    pub async fn put(&self, key: impl Into<String>, html: String) {
        let page = CachedPage {
            body: Bytes::from(html),
            generated_at: Instant::now(),
        };
        let mut guard = self.entries.write().await;
        if let Some((evicted, _)) = guard.push(key.into(), page) {
            tracing::debug!(path = %evicted, "Evicted cached page");
        }
    }

    pub async fn remove(&self, key: &str) {
        let mut guard = self.entries.write().await;
        guard.pop(key);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Claims the right to regenerate `key`. Returns `None` while another
    /// regeneration of the same key holds its guard.
    pub fn try_begin_regeneration(&self, key: &str) -> Option<RegenerationGuard> {
        match self.regenerating.entry(key.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(RegenerationGuard {
                    key: key.to_string(),
                    regenerating: Arc::clone(&self.regenerating),
                })
            }
        }
    }
}

/// Releases the regeneration slot on drop.
pub struct RegenerationGuard {
    key: String,
    regenerating: Arc<DashMap<String, ()>>,
}

impl Drop for RegenerationGuard {
    fn drop(&mut self) {
        self.regenerating.remove(&self.key);
    }
}

impl CachedPage {
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn age(&self) -> Duration {
        self.generated_at.elapsed()
    }

    pub fn into_response(self) -> Response {
        let mut response = (StatusCode::OK, self.body).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capacity(pages: usize) -> NonZeroUsize {
        NonZeroUsize::new(pages).expect("non-zero capacity")
    }

    #[tokio::test]
    async fn fresh_pages_are_served_as_fresh() {
        let cache = PageCache::new(Duration::from_secs(1800), capacity(8));
        cache.put("/post/a", "<p>a</p>".to_string()).await;

        match cache.get("/post/a").await {
            Lookup::Fresh(page) => assert_eq!(page.body().as_ref(), b"<p>a</p>"),
            _ => panic!("expected a fresh page"),
        }
    }

    #[tokio::test]
    async fn pages_past_max_age_are_stale_but_kept() {
        let cache = PageCache::new(Duration::ZERO, capacity(8));
        cache.put("/post/a", "<p>a</p>".to_string()).await;

        assert!(matches!(cache.get("/post/a").await, Lookup::Stale(_)));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn missing_and_removed_pages() {
        let cache = PageCache::new(Duration::from_secs(60), capacity(8));
        assert!(matches!(cache.get("/post/a").await, Lookup::Missing));

        cache.put("/post/a", String::new()).await;
        cache.remove("/post/a").await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn least_recently_used_page_is_evicted_at_capacity() {
        let cache = PageCache::new(Duration::from_secs(60), capacity(2));
        cache.put("/post/a", "a".to_string()).await;
        cache.put("/post/b", "b".to_string()).await;

        // Touch `a` so `b` becomes the eviction candidate.
        assert!(matches!(cache.get("/post/a").await, Lookup::Fresh(_)));
        cache.put("/post/c", "c".to_string()).await;

        assert_eq!(cache.len().await, 2);
        assert!(matches!(cache.get("/post/b").await, Lookup::Missing));
        assert!(matches!(cache.get("/post/a").await, Lookup::Fresh(_)));
        assert!(matches!(cache.get("/post/c").await, Lookup::Fresh(_)));
    }

    #[test]
    fn regeneration_is_claimed_once_per_key() {
        let cache = PageCache::new(Duration::from_secs(60), capacity(8));

        let guard = cache.try_begin_regeneration("/post/a").expect("first claim");
        assert!(cache.try_begin_regeneration("/post/a").is_none());
        assert!(cache.try_begin_regeneration("/post/b").is_some());

        drop(guard);
        assert!(cache.try_begin_regeneration("/post/a").is_some());
    }

    #[test]
    fn cached_page_responds_with_html() {
        let page = CachedPage {
            body: Bytes::from_static(b"<p>a</p>"),
            generated_at: Instant::now(),
        };

        let response = page.into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE),
            Some(&HeaderValue::from_static("text/html; charset=utf-8"))
        );
    }
}

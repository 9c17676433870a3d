//! TTL payload cache with graceful degradation.
//!
//! The cache stores raw upstream response bodies keyed by a hash of the
//! canonical request URL. Backend failures never fail the surrounding
//! request: a failed read falls back to a direct fetch, a failed write is
//! logged and swallowed.

use std::{
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::Result;

/// A cached raw payload plus its insertion time.
///
/// The timestamp lets `get_or_fetch` re-check expiry itself instead of
/// trusting the backend's eviction alone.
#[derive(Clone, Debug)]
pub struct CacheRecord {
    pub stored_at: Instant,
    pub payload: Arc<Vec<u8>>,
}

impl CacheRecord {
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            stored_at: Instant::now(),
            payload: Arc::new(payload),
        }
    }
}

/// Key/value backend port. Both operations are fallible so an external cache
/// service can slot in behind the same interface.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheRecord>>;
    async fn set(&self, key: &str, record: CacheRecord) -> Result<()>;
}

/// In-process backend: capacity-bounded, fixed time-to-live.
pub struct MemoryStore {
    inner: moka::future::Cache<String, CacheRecord>,
}

impl MemoryStore {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: moka::future::Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<CacheRecord>> {
        Ok(self.inner.get(key).await)
    }

    async fn set(&self, key: &str, record: CacheRecord) -> Result<()> {
        self.inner.insert(key.to_string(), record).await;
        Ok(())
    }
}

/// Fetch-or-serve-cached front for catalog listing requests.
pub struct PayloadCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl PayloadCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Deterministic key for a canonical request URL (query string included;
    /// an API key participates in result identity, so hashing it is fine).
    pub fn request_key(url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// On a hit within TTL, return the stored payload without invoking
    /// `fetch`. On a miss, an expired record, or any backend error, invoke
    /// `fetch`, store the result, and return it. A store failure after a
    /// successful fetch is logged, not propagated.
    pub async fn get_or_fetch<F, Fut>(&self, url: &str, fetch: F) -> Result<Vec<u8>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>>>,
    {
        let key = Self::request_key(url);

        match self.store.get(&key).await {
            Ok(Some(record)) if record.stored_at.elapsed() < self.ttl => {
                debug!("cache hit for {url} ({} bytes)", record.payload.len());
                return Ok(record.payload.as_ref().clone());
            }
            Ok(_) => {}
            Err(e) => {
                // Cache might be down; keep serving requests without it.
                warn!("cache read failed for {url}: {e}");
            }
        }

        let payload = fetch().await?;

        if let Err(e) = self
            .store
            .set(&key, CacheRecord::new(payload.clone()))
            .await
        {
            warn!("cache write failed for {url}: {e}");
        }

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::errors::Error;

    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<CacheRecord>> {
            Err(Error::Unexpected("backend down".to_string()))
        }

        async fn set(&self, _key: &str, _record: CacheRecord) -> Result<()> {
            Err(Error::Unexpected("backend down".to_string()))
        }
    }

    fn counting_fetch(
        counter: Arc<AtomicUsize>,
    ) -> impl Fn() -> std::pin::Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send>> {
        move || {
            let counter = counter.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(b"payload".to_vec())
            })
        }
    }

    #[test]
    fn request_key_is_deterministic_and_distinct() {
        let a = PayloadCache::request_key("https://x.example/search?q=pony");
        let b = PayloadCache::request_key("https://x.example/search?q=pony");
        let c = PayloadCache::request_key("https://x.example/search?q=cat");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn second_request_within_ttl_serves_cached_payload() {
        let ttl = Duration::from_secs(60);
        let cache = PayloadCache::new(Arc::new(MemoryStore::new(16, ttl)), ttl);
        let fetches = Arc::new(AtomicUsize::new(0));
        let fetch = counting_fetch(fetches.clone());

        let url = "https://x.example/search?q=pony";
        let first = cache.get_or_fetch(url, &fetch).await.unwrap();
        let second = cache.get_or_fetch(url, &fetch).await.unwrap();

        assert_eq!(first, b"payload");
        assert_eq!(second, b"payload");
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn request_after_ttl_fetches_again() {
        let ttl = Duration::from_millis(40);
        let cache = PayloadCache::new(Arc::new(MemoryStore::new(16, ttl)), ttl);
        let fetches = Arc::new(AtomicUsize::new(0));
        let fetch = counting_fetch(fetches.clone());

        let url = "https://x.example/search?q=pony";
        cache.get_or_fetch(url, &fetch).await.unwrap();
        cache.get_or_fetch(url, &fetch).await.unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(80)).await;

        cache.get_or_fetch(url, &fetch).await.unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn distinct_urls_do_not_share_records() {
        let ttl = Duration::from_secs(60);
        let cache = PayloadCache::new(Arc::new(MemoryStore::new(16, ttl)), ttl);
        let fetches = Arc::new(AtomicUsize::new(0));
        let fetch = counting_fetch(fetches.clone());

        cache
            .get_or_fetch("https://x.example/a", &fetch)
            .await
            .unwrap();
        cache
            .get_or_fetch("https://x.example/b", &fetch)
            .await
            .unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn broken_backend_degrades_to_direct_fetch() {
        let cache = PayloadCache::new(Arc::new(BrokenStore), Duration::from_secs(60));
        let fetches = Arc::new(AtomicUsize::new(0));
        let fetch = counting_fetch(fetches.clone());

        let url = "https://x.example/search?q=pony";
        let out = cache.get_or_fetch(url, &fetch).await.unwrap();
        assert_eq!(out, b"payload");

        // Nothing was stored, so every request falls through to the fetch.
        cache.get_or_fetch(url, &fetch).await.unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fetch_errors_propagate() {
        let ttl = Duration::from_secs(60);
        let cache = PayloadCache::new(Arc::new(MemoryStore::new(16, ttl)), ttl);

        let out = cache
            .get_or_fetch("https://x.example/broken", || async {
                Err(Error::TransientUpstream {
                    catalog: "x.example".to_string(),
                    reason: "boom".to_string(),
                })
            })
            .await;

        assert!(matches!(out, Err(Error::TransientUpstream { .. })));
    }
}

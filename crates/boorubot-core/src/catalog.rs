use async_trait::async_trait;

use crate::{entry::Entry, recipe::Limiter, Result};

/// Port over a remote content catalog.
///
/// One implementation per remote service. Listing fetches (`fetch_top`,
/// `fetch_search`) return the raw response body and route through the
/// payload cache; `normalize` re-derives entries from that raw payload on
/// every read; `download_image` is a direct, uncached fetch of the binary
/// payload.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Human-visible catalog name (used in apologies and logs).
    fn name(&self) -> &str;

    async fn fetch_top(&self, limiter: &Limiter) -> Result<Vec<u8>>;

    async fn fetch_search(&self, query: &str, limiter: &Limiter) -> Result<Vec<u8>>;

    /// Parse a raw listing payload into filtered, normalized entries.
    fn normalize(&self, raw: &[u8]) -> Result<Vec<Entry>>;

    async fn download_image(&self, entry: &Entry) -> Result<Vec<u8>>;

    async fn top_entries(&self, limiter: &Limiter) -> Result<Vec<Entry>> {
        let raw = self.fetch_top(limiter).await?;
        self.normalize(&raw)
    }

    async fn search_entries(&self, query: &str, limiter: &Limiter) -> Result<Vec<Entry>> {
        let raw = self.fetch_search(query, limiter).await?;
        self.normalize(&raw)
    }
}

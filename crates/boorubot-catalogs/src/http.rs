use std::{sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use boorubot_core::{cache::PayloadCache, errors::Error, Result};

use crate::pacer::Pacer;

/// Shared HTTP plumbing for one catalog: a client with a fixed timeout and
/// User-Agent, the payload cache for listing fetches, and the pacer applied
/// around actual network calls (cache hits are not paced).
pub struct CatalogHttp {
    catalog: &'static str,
    client: reqwest::Client,
    cache: Arc<PayloadCache>,
    pacer: Mutex<Pacer>,
}

impl CatalogHttp {
    pub fn new(
        catalog: &'static str,
        timeout: Duration,
        max_rps: f64,
        cache: Arc<PayloadCache>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(crate::USER_AGENT)
            .build()
            .map_err(|e| Error::Config(format!("{catalog}: http client: {e}")))?;

        Ok(Self {
            catalog,
            client,
            cache,
            pacer: Mutex::new(Pacer::new(max_rps)),
        })
    }

    /// Fetch a listing URL through the cache. The fetched body must be JSON;
    /// anything else counts as a transient upstream failure.
    pub async fn cached_get(&self, url: &Url) -> Result<Vec<u8>> {
        self.cache
            .get_or_fetch(url.as_str(), || self.fetch_listing(url))
            .await
    }

    async fn fetch_listing(&self, url: &Url) -> Result<Vec<u8>> {
        self.pacer.lock().await.wait().await;
        debug!("fetching {url}");

        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.transient(format!("request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| self.transient(format!("reading body failed: {e}")))?;

        if !status.is_success() {
            return Err(self.transient(format!("unexpected status {status}")));
        }
        if serde_json::from_slice::<serde_json::Value>(&body).is_err() {
            return Err(self.transient("body is not JSON".to_string()));
        }

        Ok(body.to_vec())
    }

    /// Direct, uncached fetch of a binary payload.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let location = ensure_https(url);
        debug!("downloading {location}");

        let resp = self
            .client
            .get(&location)
            .send()
            .await
            .map_err(|e| self.download_failed(format!("request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| self.download_failed(format!("reading body failed: {e}")))?;

        if !status.is_success() {
            return Err(self.download_failed(format!("unexpected status {status}")));
        }

        Ok(body.to_vec())
    }

    fn transient(&self, reason: String) -> Error {
        Error::TransientUpstream {
            catalog: self.catalog.to_string(),
            reason,
        }
    }

    fn download_failed(&self, reason: String) -> Error {
        Error::Download {
            catalog: self.catalog.to_string(),
            reason,
        }
    }
}

/// Catalogs occasionally hand out scheme-less CDN URLs (`//cdn...`).
pub fn ensure_https(url: &str) -> String {
    let Some(rest) = url.strip_prefix("//") else {
        return url.to_string();
    };
    format!("https://{rest}")
}

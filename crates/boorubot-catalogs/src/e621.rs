use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use url::Url;

use boorubot_core::{
    cache::PayloadCache,
    catalog::Catalog,
    config::Config,
    entry::{Entry, EntryFilter},
    errors::Error,
    recipe::Limiter,
    Result,
};

use crate::http::{ensure_https, CatalogHttp};

const NAME: &str = "e621.net";
const POSTS_ENDPOINT: &str = "https://e621.net/posts.json";

const TOP_WINDOW_DAYS: i64 = 3;
const LISTING_LIMIT: &str = "100";

/// Telegram rejects photos above 5 MiB; oversized files fall back to the
/// sample (or preview) representation.
const PHOTO_MAX_BYTES: u64 = 5 * 1024 * 1024;

pub struct E621 {
    http: CatalogHttp,
    endpoint: Url,
    filter: EntryFilter,
}

#[derive(Deserialize)]
struct Listing {
    posts: Option<Vec<RawPost>>,
    success: Option<bool>,
    reason: Option<String>,
}

#[derive(Deserialize)]
struct RawPost {
    id: Option<i64>,
    score: Option<RawScore>,
    file: Option<RawFile>,
    sample: Option<RawSample>,
    preview: Option<RawPreview>,
    tags: Option<HashMap<String, Vec<String>>>,
}

#[derive(Deserialize)]
struct RawScore {
    total: Option<i64>,
}

#[derive(Deserialize)]
struct RawFile {
    ext: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    url: Option<String>,
    size: Option<u64>,
}

#[derive(Deserialize)]
struct RawSample {
    #[serde(default)]
    has: bool,
    url: Option<String>,
}

#[derive(Deserialize)]
struct RawPreview {
    url: Option<String>,
}

impl E621 {
    pub fn new(cfg: &Config, cache: Arc<PayloadCache>) -> Result<Self> {
        let endpoint = Url::parse(POSTS_ENDPOINT)
            .map_err(|e| Error::Config(format!("{NAME}: bad endpoint: {e}")))?;

        Ok(Self {
            http: CatalogHttp::new(NAME, cfg.http_timeout, cfg.e621_max_rps, cache)?,
            endpoint,
            filter: EntryFilter::new(&cfg.blocked_tags, &cfg.blocked_extensions),
        })
    }

    /// Canonical listing URL. e621 tags are whitespace-separated; sorted so
    /// identical requests hash identically.
    fn listing_url(&self, search: &str, limiter: &Limiter) -> Url {
        let mut tags: Vec<String> = search
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();
        let is_top = tags.is_empty();

        match limiter {
            Limiter::Safe => tags.push("rating:s".to_string()),
            Limiter::Suggestive => tags.push("rating:q".to_string()),
            Limiter::Explicit => tags.push("rating:e".to_string()),
            Limiter::CustomTag(tag) => tags.push(tag.to_lowercase()),
        }

        if is_top {
            let from = (Utc::now() - chrono::Duration::days(TOP_WINDOW_DAYS))
                .format("%Y-%m-%d")
                .to_string();
            tags.push("order:score".to_string());
            tags.push(format!("date:>={from}"));
        }

        tags.sort();

        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("tags", &tags.join(" "))
            .append_pair("limit", LISTING_LIMIT);
        url
    }

    fn pick_image_url(file: &RawFile, sample: Option<&RawSample>, preview: Option<&RawPreview>) -> Option<String> {
        let original = file.url.as_deref().filter(|u| !u.is_empty())?;
        let ext = file.ext.as_deref().unwrap_or_default();
        let size = file.size.unwrap_or(0);

        if ext != "gif" && size > PHOTO_MAX_BYTES {
            let sample_url = sample
                .filter(|s| s.has)
                .and_then(|s| s.url.as_deref())
                .filter(|u| !u.is_empty());
            let preview_url = preview
                .and_then(|p| p.url.as_deref())
                .filter(|u| !u.is_empty());
            if let Some(url) = sample_url.or(preview_url) {
                return Some(url.to_string());
            }
        }

        Some(original.to_string())
    }
}

#[async_trait]
impl Catalog for E621 {
    fn name(&self) -> &str {
        NAME
    }

    async fn fetch_top(&self, limiter: &Limiter) -> Result<Vec<u8>> {
        self.http.cached_get(&self.listing_url("", limiter)).await
    }

    async fn fetch_search(&self, query: &str, limiter: &Limiter) -> Result<Vec<u8>> {
        self.http
            .cached_get(&self.listing_url(query, limiter))
            .await
    }

    fn normalize(&self, raw: &[u8]) -> Result<Vec<Entry>> {
        let listing: Listing =
            serde_json::from_slice(raw).map_err(|e| Error::TransientUpstream {
                catalog: NAME.to_string(),
                reason: format!("unexpected listing shape: {e}"),
            })?;

        if listing.success == Some(false) {
            return Err(Error::UpstreamReported {
                catalog: NAME.to_string(),
                reason: listing
                    .reason
                    .unwrap_or_else(|| "no reason given".to_string()),
            });
        }

        let posts = listing.posts.ok_or_else(|| Error::TransientUpstream {
            catalog: NAME.to_string(),
            reason: "listing has no posts".to_string(),
        })?;

        let mut entries = Vec::with_capacity(posts.len());
        for raw in posts {
            let Some(id) = raw.id else { continue };
            let Some(score) = raw.score.as_ref().and_then(|s| s.total) else {
                continue;
            };
            let Some(file) = raw.file.as_ref() else { continue };
            let Some(image) =
                Self::pick_image_url(file, raw.sample.as_ref(), raw.preview.as_ref())
            else {
                continue;
            };

            let thumb = raw
                .preview
                .as_ref()
                .and_then(|p| p.url.as_deref())
                .filter(|u| !u.is_empty())
                .unwrap_or(&image);

            entries.push(Entry {
                id: id.to_string(),
                score,
                tags: raw
                    .tags
                    .iter()
                    .flat_map(|groups| groups.values())
                    .flatten()
                    .map(|t| t.to_lowercase())
                    .collect(),
                extension: file.ext.clone().unwrap_or_default().to_lowercase(),
                image_url: ensure_https(&image),
                thumb_url: ensure_https(thumb),
                permalink: format!("https://e621.net/posts/{id}"),
                width: file.width.unwrap_or(0),
                height: file.height.unwrap_or(0),
            });
        }

        Ok(self.filter.apply(entries))
    }

    async fn download_image(&self, entry: &Entry) -> Result<Vec<u8>> {
        self.http.download(&entry.image_url).await
    }
}

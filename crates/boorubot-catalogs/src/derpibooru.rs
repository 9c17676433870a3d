use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
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

const NAME: &str = "derpibooru.org";
const SEARCH_ENDPOINT: &str = "https://derpibooru.org/api/v1/json/search/images";

/// Empty searches return the top scorers of the last three days.
const TOP_WINDOW_DAYS: i64 = 3;

pub struct Derpibooru {
    http: CatalogHttp,
    endpoint: Url,
    api_key: Option<String>,
    blocked_tags: Vec<String>,
    filter: EntryFilter,
}

#[derive(Deserialize)]
struct Listing {
    images: Vec<RawImage>,
}

#[derive(Deserialize)]
struct RawImage {
    id: Option<i64>,
    score: Option<i64>,
    #[serde(default)]
    tags: Vec<String>,
    format: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    representations: HashMap<String, String>,
}

impl Derpibooru {
    pub fn new(cfg: &Config, cache: Arc<PayloadCache>) -> Result<Self> {
        let endpoint = Url::parse(SEARCH_ENDPOINT)
            .map_err(|e| Error::Config(format!("{NAME}: bad endpoint: {e}")))?;

        Ok(Self {
            http: CatalogHttp::new(NAME, cfg.http_timeout, cfg.derpibooru_max_rps, cache)?,
            endpoint,
            api_key: cfg.derpibooru_api_key.clone(),
            blocked_tags: cfg.blocked_tags.clone(),
            filter: EntryFilter::new(&cfg.blocked_tags, &cfg.blocked_extensions),
        })
    }

    /// Canonical listing URL for a search (empty search = top of the last
    /// three days). Tags are sorted so identical requests hash identically.
    fn listing_url(&self, search: &str, limiter: &Limiter) -> Url {
        let mut tags: Vec<String> = search
            .split(',')
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        let is_top = tags.is_empty();

        match limiter {
            Limiter::Safe => tags.push("safe".to_string()),
            Limiter::Suggestive => tags.push("suggestive".to_string()),
            Limiter::Explicit => tags.push("explicit".to_string()),
            Limiter::CustomTag(tag) => tags.push(tag.to_lowercase()),
        }

        for tag in &self.blocked_tags {
            tags.push(format!("-{tag}"));
        }

        if is_top {
            let from = (Utc::now() - chrono::Duration::days(TOP_WINDOW_DAYS))
                .to_rfc3339_opts(SecondsFormat::Secs, true);
            tags.push(format!("created_at.gt:{from}"));
        }

        tags.sort();

        let mut url = self.endpoint.clone();
        {
            let mut q = url.query_pairs_mut();
            if let Some(key) = &self.api_key {
                q.append_pair("key", key);
            }
            q.append_pair("q", &tags.join(", "));
            if is_top {
                q.append_pair("sf", "score");
                q.append_pair("sd", "desc");
            }
        }
        url
    }
}

#[async_trait]
impl Catalog for Derpibooru {
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

        let mut entries = Vec::with_capacity(listing.images.len());
        for image in listing.images {
            // Malformed entries are dropped, not propagated.
            let Some(id) = image.id else { continue };
            let Some(score) = image.score else { continue };
            let Some(tall) = image.representations.get("tall") else {
                continue;
            };
            if tall.is_empty() {
                continue;
            }

            let thumb = image
                .representations
                .get("thumb")
                .filter(|u| !u.is_empty())
                .unwrap_or(tall);

            entries.push(Entry {
                id: id.to_string(),
                score,
                tags: image.tags.iter().map(|t| t.to_lowercase()).collect(),
                extension: image.format.clone().unwrap_or_default().to_lowercase(),
                image_url: ensure_https(tall),
                thumb_url: ensure_https(thumb),
                permalink: format!("https://derpibooru.org/{id}"),
                width: image.width.unwrap_or(0),
                height: image.height.unwrap_or(0),
            });
        }

        Ok(self.filter.apply(entries))
    }

    async fn download_image(&self, entry: &Entry) -> Result<Vec<u8>> {
        self.http.download(&entry.image_url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{test_cache, test_config};

    fn adapter() -> Derpibooru {
        Derpibooru::new(&test_config(), test_cache()).unwrap()
    }

    fn query_param(url: &Url, name: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn search_url_carries_limiter_and_blocked_tags() {
        let url = adapter().listing_url("Celestia, Luna", &Limiter::Safe);
        let q = query_param(&url, "q").unwrap();

        assert!(q.contains("celestia"));
        assert!(q.contains("luna"));
        assert!(q.contains("safe"));
        assert!(q.contains("-3d"));
        assert!(q.contains("-comic"));
        assert!(query_param(&url, "sf").is_none());
    }

    #[test]
    fn empty_search_becomes_top_of_last_days() {
        let url = adapter().listing_url("", &Limiter::Explicit);
        let q = query_param(&url, "q").unwrap();

        assert!(q.contains("explicit"));
        assert!(q.contains("created_at.gt:"));
        assert_eq!(query_param(&url, "sf").as_deref(), Some("score"));
        assert_eq!(query_param(&url, "sd").as_deref(), Some("desc"));
    }

    #[test]
    fn api_key_is_included_when_configured() {
        let mut cfg = test_config();
        cfg.derpibooru_api_key = Some("sekrit".to_string());
        let adapter = Derpibooru::new(&cfg, test_cache()).unwrap();

        let url = adapter.listing_url("pony", &Limiter::Safe);
        assert_eq!(query_param(&url, "key").as_deref(), Some("sekrit"));
    }

    #[test]
    fn identical_searches_build_identical_urls() {
        let a = adapter().listing_url("luna, celestia", &Limiter::Safe);
        let b = adapter().listing_url("luna,   celestia", &Limiter::Safe);
        assert_eq!(a.as_str(), b.as_str());
    }

    #[test]
    fn custom_tag_limiter_is_appended() {
        let url = adapter().listing_url("pony", &Limiter::CustomTag("Plushie".to_string()));
        let q = query_param(&url, "q").unwrap();
        assert!(q.contains("plushie"));
    }

    #[test]
    fn normalize_builds_entries_and_drops_malformed_ones() {
        let body = r#"{
            "images": [
                {
                    "id": 100,
                    "score": 25,
                    "tags": ["Safe", "Pony"],
                    "format": "PNG",
                    "width": 800,
                    "height": 600,
                    "representations": {
                        "tall": "//derpicdn.example/100/tall.png",
                        "thumb": "https://derpicdn.example/100/thumb.png"
                    }
                },
                {
                    "id": 101,
                    "tags": ["safe"],
                    "format": "png",
                    "representations": {"tall": "https://derpicdn.example/101/tall.png"}
                },
                {
                    "id": 102,
                    "score": 7,
                    "tags": ["safe"],
                    "format": "png",
                    "representations": {}
                }
            ]
        }"#;

        let entries = adapter().normalize(body.as_bytes()).unwrap();

        // 101 has no score, 102 has no image URL.
        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e.id, "100");
        assert_eq!(e.score, 25);
        assert_eq!(e.image_url, "https://derpicdn.example/100/tall.png");
        assert_eq!(e.permalink, "https://derpibooru.org/100");
        assert!(e.tags.contains("pony"));
        assert_eq!(e.extension, "png");
    }

    #[test]
    fn normalize_applies_blocklists() {
        let body = r#"{
            "images": [
                {
                    "id": 1, "score": 5, "tags": ["pony"], "format": "webm",
                    "representations": {"tall": "https://x.example/1"}
                },
                {
                    "id": 2, "score": 5, "tags": ["pony", "3d"], "format": "png",
                    "representations": {"tall": "https://x.example/2"}
                },
                {
                    "id": 3, "score": 5, "tags": ["pony"], "format": "png",
                    "representations": {"tall": "https://x.example/3"}
                }
            ]
        }"#;

        let entries = adapter().normalize(body.as_bytes()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "3");
    }

    #[test]
    fn normalize_rejects_wrong_shapes() {
        let adapter = adapter();
        assert!(matches!(
            adapter.normalize(b"not json at all"),
            Err(Error::TransientUpstream { .. })
        ));
        assert!(matches!(
            adapter.normalize(br#"{"posts": []}"#),
            Err(Error::TransientUpstream { .. })
        ));
    }
}

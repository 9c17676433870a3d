use std::{sync::Arc, time::Duration};

use boorubot_core::{
    cache::{MemoryStore, PayloadCache},
    config::Config,
};

pub fn test_config() -> Config {
    Config {
        telegram_bot_token: "test-token".to_string(),
        derpibooru_api_key: None,
        derpibooru_max_rps: 10.0,
        e621_max_rps: 1.0,
        blocked_tags: vec!["3d".to_string(), "cgi".to_string(), "comic".to_string()],
        blocked_extensions: vec!["webm".to_string(), "swf".to_string()],
        restricted_terms: vec![
            "explicit".to_string(),
            "clop".to_string(),
            "nsfw".to_string(),
            "sex".to_string(),
        ],
        cache_ttl: Duration::from_secs(600),
        cache_capacity: 16,
        http_timeout: Duration::from_secs(5),
        poll_timeout: Duration::from_secs(20),
    }
}

pub fn test_cache() -> Arc<PayloadCache> {
    let ttl = Duration::from_secs(600);
    Arc::new(PayloadCache::new(Arc::new(MemoryStore::new(16, ttl)), ttl))
}

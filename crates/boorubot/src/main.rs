use std::sync::Arc;

use teloxide::Bot;
use tracing::info;

use boorubot_catalogs::{Derpibooru, E621};
use boorubot_core::{
    cache::{MemoryStore, PayloadCache},
    catalog::Catalog,
    config::{restricted_pattern, Config},
    dispatcher::Dispatcher,
    recipe::default_recipes,
};
use boorubot_telegram::TelegramMessenger;

#[tokio::main]
async fn main() -> Result<(), boorubot_core::Error> {
    boorubot_core::logging::init("boorubot")?;

    let cfg = Arc::new(Config::load()?);

    let store = Arc::new(MemoryStore::new(cfg.cache_capacity, cfg.cache_ttl));
    let cache = Arc::new(PayloadCache::new(store, cfg.cache_ttl));

    let derpibooru: Arc<dyn Catalog> = Arc::new(Derpibooru::new(&cfg, cache.clone())?);
    let e621: Arc<dyn Catalog> = Arc::new(E621::new(&cfg, cache)?);

    let recipes = default_recipes(derpibooru.clone(), e621);
    let restricted = restricted_pattern(&cfg.restricted_terms)?;

    let bot = Bot::new(cfg.telegram_bot_token.clone());
    let messenger = Arc::new(TelegramMessenger::new(bot.clone()));

    // Inline queries are served from Derpibooru, same as the chat commands'
    // default catalog.
    let dispatcher = Arc::new(Dispatcher::new(recipes, derpibooru, messenger, restricted));

    info!(
        "boorubot started (cache ttl {}s, {} blocked tags)",
        cfg.cache_ttl.as_secs(),
        cfg.blocked_tags.len()
    );

    boorubot_telegram::router::run_polling(bot, dispatcher, cfg.poll_timeout).await
}

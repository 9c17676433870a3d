//! Static binding of user-facing triggers to catalogs, strategies and
//! limiters. The table is built once at startup and immutable afterwards.

use std::sync::Arc;

use crate::{
    catalog::Catalog,
    entry::Entry,
    select::{select_random, select_top, select_worst},
    Result,
};

/// Safety/content-rating gate applied to a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Limiter {
    Safe,
    Suggestive,
    Explicit,
    /// Restrict results to a fixed tag instead of a rating.
    CustomTag(String),
}

impl Limiter {
    pub fn is_safe(&self) -> bool {
        matches!(self, Limiter::Safe)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
    Top,
    Worst,
    Random,
}

/// Typed strategy: what to fetch is decided by the dispatcher (empty vs.
/// non-empty input); the strategy owns the caption and the pick.
#[derive(Clone, Debug)]
pub struct Strategy {
    pub caption: String,
    pub selection: Selection,
}

impl Strategy {
    pub fn new(caption: &str, selection: Selection) -> Self {
        Self {
            caption: caption.to_string(),
            selection,
        }
    }

    /// Resolve `(caption, entry-or-none)` for the given query and limiter.
    pub async fn run(
        &self,
        catalog: &dyn Catalog,
        query: &str,
        limiter: &Limiter,
    ) -> Result<(String, Option<Entry>)> {
        let entries = if query.is_empty() {
            catalog.top_entries(limiter).await?
        } else {
            catalog.search_entries(query, limiter).await?
        };

        let picked = match self.selection {
            Selection::Top => select_top(&entries),
            Selection::Worst => select_worst(&entries),
            Selection::Random => select_random(&entries),
        }
        .cloned();

        Ok((self.caption.clone(), picked))
    }
}

/// One user-facing trigger bound to a catalog, strategies and a limiter.
#[derive(Clone)]
pub struct CommandRecipe {
    /// Lowercase command word, without the leading slash.
    pub trigger: String,
    pub catalog: Arc<dyn Catalog>,
    pub limiter: Limiter,
    pub on_empty: Strategy,
    pub on_search: Strategy,
}

impl CommandRecipe {
    pub fn new(
        trigger: &str,
        catalog: Arc<dyn Catalog>,
        limiter: Limiter,
        on_empty: Strategy,
        on_search: Strategy,
    ) -> Self {
        Self {
            trigger: trigger.to_lowercase(),
            catalog,
            limiter,
            on_empty,
            on_search,
        }
    }
}

pub const CAPTION_TOP_3_DAYS: &str = "Random top scoring image in last 3 days";
pub const CAPTION_BEST_RECENT: &str = "Best recent image for your search";
pub const CAPTION_RANDOM_RECENT: &str = "Random recent image for your search";
pub const CAPTION_WORST_RECENT: &str = "Worst recent image for your search";

/// The default command table, carried over from the deployed bot.
pub fn default_recipes(
    derpibooru: Arc<dyn Catalog>,
    e621: Arc<dyn Catalog>,
) -> Vec<CommandRecipe> {
    let random_top = || Strategy::new(CAPTION_TOP_3_DAYS, Selection::Random);
    let worst_top = || Strategy::new(CAPTION_TOP_3_DAYS, Selection::Worst);
    let best = || Strategy::new(CAPTION_BEST_RECENT, Selection::Top);
    let random = || Strategy::new(CAPTION_RANDOM_RECENT, Selection::Random);
    let worst = || Strategy::new(CAPTION_WORST_RECENT, Selection::Worst);

    vec![
        CommandRecipe::new(
            "pony",
            derpibooru.clone(),
            Limiter::Safe,
            random_top(),
            best(),
        ),
        CommandRecipe::new(
            "randpony",
            derpibooru.clone(),
            Limiter::Safe,
            random_top(),
            random(),
        ),
        CommandRecipe::new(
            "worstpony",
            derpibooru.clone(),
            Limiter::Safe,
            worst_top(),
            worst(),
        ),
        CommandRecipe::new(
            "clop",
            derpibooru.clone(),
            Limiter::Explicit,
            random_top(),
            best(),
        ),
        CommandRecipe::new(
            "randclop",
            derpibooru,
            Limiter::Explicit,
            random_top(),
            random(),
        ),
        CommandRecipe::new(
            "yiff",
            e621.clone(),
            Limiter::Explicit,
            random_top(),
            random(),
        ),
        CommandRecipe::new(
            "feral",
            e621.clone(),
            Limiter::CustomTag("feral".to_string()),
            random_top(),
            random(),
        ),
        CommandRecipe::new(
            "horsecock",
            e621,
            Limiter::CustomTag("horsecock".to_string()),
            random_top(),
            random(),
        ),
    ]
}

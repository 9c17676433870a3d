//! Command dispatcher: maps one inbound trigger or inline query to a
//! (catalog, strategy, limiter) recipe and drives the request end to end.
//!
//! Every per-request error is converted here into a single outbound text
//! message; nothing escapes to the polling loop except transport faults.

use std::sync::Arc;

use regex::Regex;
use tracing::{debug, error, warn};

use crate::{
    catalog::Catalog,
    entry::Entry,
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{
            ChatAction, CommandMessage, Inbound, InlineKind, InlineQueryRequest, InlineResult,
            PhotoPayload,
        },
    },
    recipe::{CommandRecipe, Limiter},
    select::sort_by_score_desc,
    Result,
};

/// Telegram allows at most 50 results per inline query answer.
const INLINE_RESULT_LIMIT: usize = 50;

const GREETING: &str = "Hello! I'm a bot that sends images from derpibooru.org and e621.net.\n\n\
    To get a random top scoring pony: /pony\n\n\
    To get the best recent picture with Celestia: /pony Celestia\n\n\
    To search e621: /yiff horsecock\n\n\
    You get the idea :)";

const REJECTION: &str = "You're naughty. Use /clop (you must be older than 18)";

pub struct Dispatcher {
    recipes: Vec<CommandRecipe>,
    /// Catalog serving inline queries.
    inline_catalog: Arc<dyn Catalog>,
    messenger: Arc<dyn MessagingPort>,
    restricted: Option<Regex>,
}

impl Dispatcher {
    pub fn new(
        recipes: Vec<CommandRecipe>,
        inline_catalog: Arc<dyn Catalog>,
        messenger: Arc<dyn MessagingPort>,
        restricted: Option<Regex>,
    ) -> Self {
        Self {
            recipes,
            inline_catalog,
            messenger,
            restricted,
        }
    }

    /// Run one inbound request to completion. Never returns an error: every
    /// failure is logged and rendered as a user-visible message here.
    pub async fn handle(&self, inbound: Inbound) {
        match inbound {
            Inbound::Command(cmd) => self.handle_command(cmd).await,
            Inbound::Inline(query) => self.handle_inline(query).await,
        }
    }

    async fn handle_command(&self, cmd: CommandMessage) {
        if matches!(cmd.trigger.as_str(), "hello" | "help" | "start") {
            if let Err(e) = self
                .messenger
                .send_text(cmd.chat_id, GREETING, Some(cmd.message_id), true)
                .await
            {
                warn!("greeting send failed: {e}");
            }
            return;
        }

        let Some(recipe) = self.recipes.iter().find(|r| r.trigger == cmd.trigger) else {
            // Not a trigger we know; fall through silently.
            debug!("ignoring unknown trigger {:?}", cmd.trigger);
            return;
        };

        if let Err(e) = self.run_recipe(&cmd, recipe).await {
            error!("command /{} failed: {e}", cmd.trigger);
            let apology = apology_text(&e);
            if let Err(send_err) = self
                .messenger
                .send_text(cmd.chat_id, &apology, Some(cmd.message_id), true)
                .await
            {
                error!("failed to deliver apology: {send_err}");
            }
        }
    }

    async fn run_recipe(&self, cmd: &CommandMessage, recipe: &CommandRecipe) -> Result<()> {
        // Presence is best-effort; a failed indicator must not fail the request.
        if let Err(e) = self
            .messenger
            .send_chat_action(cmd.chat_id, ChatAction::UploadPhoto)
            .await
        {
            debug!("chat action failed: {e}");
        }

        let terms = cmd.args.trim();

        if !terms.is_empty() && recipe.limiter.is_safe() && self.is_restricted(terms) {
            self.messenger
                .send_text(cmd.chat_id, REJECTION, Some(cmd.message_id), true)
                .await?;
            return Ok(());
        }

        let strategy = if terms.is_empty() {
            &recipe.on_empty
        } else {
            &recipe.on_search
        };
        let (caption, entry) = strategy
            .run(recipe.catalog.as_ref(), terms, &recipe.limiter)
            .await?;

        let Some(entry) = entry else {
            let text = format!(
                "I am sorry, {}, got no images to reply with.",
                cmd.first_name
            );
            self.messenger
                .send_text(cmd.chat_id, &text, Some(cmd.message_id), true)
                .await?;
            return Ok(());
        };

        let bytes = recipe.catalog.download_image(&entry).await?;
        let photo = PhotoPayload {
            bytes,
            filename: entry.filename(),
            caption: format!("{}\n{}", entry.permalink, caption),
        };

        if let Err(e) = self
            .messenger
            .send_photo(cmd.chat_id, photo, Some(cmd.message_id))
            .await
        {
            // A rejected photo still deserves an answer; fall back to text.
            warn!("photo send failed: {e}");
            let text = apology_text(&Error::Send(e.to_string()));
            self.messenger
                .send_text(cmd.chat_id, &text, Some(cmd.message_id), true)
                .await?;
        }

        Ok(())
    }

    async fn handle_inline(&self, query: InlineQueryRequest) {
        match self.inline_results(&query).await {
            Ok(results) => {
                if let Err(e) = self.messenger.answer_inline_query(&query.id, results).await {
                    warn!("inline answer failed: {e}");
                }
            }
            Err(e) => {
                // There is no chat to apologize into; answer empty instead.
                error!("inline query {:?} failed: {e}", query.query);
                let _ = self
                    .messenger
                    .answer_inline_query(&query.id, Vec::new())
                    .await;
            }
        }
    }

    async fn inline_results(&self, query: &InlineQueryRequest) -> Result<Vec<InlineResult>> {
        let limiter = inline_limiter(&query.query);
        let terms = query.query.trim();

        let mut entries = if terms.is_empty() {
            self.inline_catalog.top_entries(&limiter).await?
        } else {
            self.inline_catalog.search_entries(terms, &limiter).await?
        };

        sort_by_score_desc(&mut entries);
        entries.truncate(INLINE_RESULT_LIMIT);

        Ok(entries.iter().map(inline_result).collect())
    }

    fn is_restricted(&self, terms: &str) -> bool {
        self.restricted
            .as_ref()
            .map(|re| re.is_match(terms))
            .unwrap_or(false)
    }
}

/// Limiter for inline queries is inferred from the query text itself.
pub fn inline_limiter(query: &str) -> Limiter {
    let q = query.to_lowercase();
    if q.contains("explicit") {
        Limiter::Explicit
    } else if q.contains("suggestive") {
        Limiter::Suggestive
    } else {
        Limiter::Safe
    }
}

fn inline_result(entry: &Entry) -> InlineResult {
    let kind = if entry.extension == "gif" {
        InlineKind::Gif
    } else {
        InlineKind::Photo
    };

    InlineResult {
        id: entry.id.clone(),
        kind,
        media_url: entry.image_url.clone(),
        thumb_url: entry.thumb_url.clone(),
        width: entry.width,
        height: entry.height,
        caption: entry.permalink.clone(),
    }
}

/// Map a per-request error onto the single outbound apology.
pub fn apology_text(err: &Error) -> String {
    match err {
        Error::TransientUpstream { catalog, .. } => {
            format!("Apologies, but looks like {catalog} is down. Please try again in a bit.")
        }
        Error::UpstreamReported { catalog, reason } => {
            format!("Apologies, but {catalog} returned an error:\n\n{reason}.")
        }
        Error::Download { catalog, .. } => format!(
            "Apologies, but I could not download the image from {catalog}. Please try again in a bit."
        ),
        Error::Send(_) => {
            "Apologies, but sending the image failed. Please try again in a bit.".to_string()
        }
        _ => "Apologies, but an unexpected error occurred. Please try again in a bit.".to_string(),
    }
}

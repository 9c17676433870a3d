//! Resilient long-polling loop.
//!
//! Updates are processed strictly one at a time in arrival order. A failure
//! inside the dispatcher only affects its own update; a failure of the
//! `getUpdates` call itself pauses briefly and re-enters the loop from the
//! top. Nothing here is fatal to the process.

use std::{sync::Arc, time::Duration};

use teloxide::{
    prelude::*,
    types::{Message as TgMessage, Update, UpdateKind},
};
use tracing::{info, warn};

use boorubot_core::{
    dispatcher::Dispatcher,
    domain::{ChatId, MessageId},
    errors::Error,
    messaging::types::{CommandMessage, Inbound, InlineQueryRequest},
};

const TRANSPORT_RETRY_PAUSE: Duration = Duration::from_secs(1);

pub async fn run_polling(bot: Bot, dispatcher: Arc<Dispatcher>, poll_timeout: Duration) -> ! {
    let mut offset: i32 = 0;
    info!("listening for updates");

    loop {
        let updates = match poll_once(&bot, offset, poll_timeout).await {
            Ok(updates) => updates,
            Err(e) => {
                warn!("{e}; reconnecting shortly");
                tokio::time::sleep(TRANSPORT_RETRY_PAUSE).await;
                continue;
            }
        };

        // The server resends everything at or after the offset; it may also
        // reset ids after long inactivity, so follow the batch maximum
        // instead of assuming ids always grow.
        if let Some(max_id) = updates.iter().map(|u| u.id).max() {
            offset = max_id + 1;
        }

        for update in updates {
            let Some(inbound) = map_update(update) else {
                continue;
            };
            log_inbound(&inbound);
            dispatcher.handle(inbound).await;
        }
    }
}

async fn poll_once(
    bot: &Bot,
    offset: i32,
    poll_timeout: Duration,
) -> std::result::Result<Vec<Update>, Error> {
    let mut req = bot.get_updates().timeout(poll_timeout.as_secs() as u32);
    if offset != 0 {
        req = req.offset(offset);
    }

    req.await
        .map_err(|e| Error::Transport(format!("getUpdates failed: {e}")))
}

fn map_update(update: Update) -> Option<Inbound> {
    match update.kind {
        UpdateKind::Message(msg) => map_message(&msg),
        UpdateKind::InlineQuery(query) => Some(Inbound::Inline(InlineQueryRequest {
            id: query.id,
            query: query.query,
        })),
        _ => None,
    }
}

fn map_message(msg: &TgMessage) -> Option<Inbound> {
    let text = msg.text()?;
    let (trigger, args) = parse_command(text)?;

    let first_name = msg
        .from()
        .map(|u| u.first_name.clone())
        .unwrap_or_else(|| "friend".to_string());

    Some(Inbound::Command(CommandMessage {
        chat_id: ChatId(msg.chat.id.0),
        message_id: MessageId(msg.id.0),
        first_name,
        trigger,
        args,
    }))
}

/// Telegram may send `/cmd@botname arg1 ...`; non-command text yields `None`.
fn parse_command(text: &str) -> Option<(String, String)> {
    let rest = text.trim().strip_prefix('/')?;

    let mut parts = rest.splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("");
    let args = parts.next().unwrap_or("").trim().to_string();

    let trigger = first.split('@').next().unwrap_or("").to_lowercase();
    if trigger.is_empty() {
        return None;
    }

    Some((trigger, args))
}

fn log_inbound(inbound: &Inbound) {
    match inbound {
        Inbound::Command(cmd) => {
            info!("<{}> /{} {:?}", cmd.first_name, cmd.trigger, cmd.args);
        }
        Inbound::Inline(query) => {
            info!("inline query {:?}", query.query);
        }
    }
}

//! Telegram adapter (teloxide).
//!
//! This crate implements the core MessagingPort over the Telegram Bot API
//! and hosts the resilient long-polling loop.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{
        InlineQueryResult, InlineQueryResultGif, InlineQueryResultPhoto, InputFile,
    },
};

use tokio::time::sleep;
use url::Url;

pub mod router;

use boorubot_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{ChatAction, InlineKind, InlineResult, PhotoPayload},
    },
    Result,
};

/// Inline answers may be cached briefly by Telegram; keep it short so fresh
/// scores show up.
const INLINE_CACHE_SECS: u32 = 1;

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Send(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        reply_to: Option<MessageId>,
        disable_preview: bool,
    ) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                let mut req = self.bot.send_message(Self::tg_chat(chat_id), text.to_string());
                if let Some(reply) = reply_to {
                    req = req.reply_to_message_id(Self::tg_msg_id(reply));
                }
                if disable_preview {
                    req = req.disable_web_page_preview(true);
                }
                req
            })
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        photo: PhotoPayload,
        reply_to: Option<MessageId>,
    ) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                let file = InputFile::memory(photo.bytes.clone()).file_name(photo.filename.clone());
                let mut req = self
                    .bot
                    .send_photo(Self::tg_chat(chat_id), file)
                    .caption(photo.caption.clone());
                if let Some(reply) = reply_to {
                    req = req.reply_to_message_id(Self::tg_msg_id(reply));
                }
                req
            })
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn send_chat_action(&self, chat_id: ChatId, action: ChatAction) -> Result<()> {
        let tg_action = match action {
            ChatAction::Typing => teloxide::types::ChatAction::Typing,
            ChatAction::UploadPhoto => teloxide::types::ChatAction::UploadPhoto,
        };
        self.with_retry(|| self.bot.send_chat_action(Self::tg_chat(chat_id), tg_action))
            .await?;
        Ok(())
    }

    async fn answer_inline_query(&self, query_id: &str, results: Vec<InlineResult>) -> Result<()> {
        // Results with unparseable URLs are skipped rather than failing the
        // whole answer.
        let mapped: Vec<InlineQueryResult> =
            results.iter().filter_map(to_inline_query_result).collect();

        self.with_retry(|| {
            self.bot
                .answer_inline_query(query_id.to_string(), mapped.clone())
                .cache_time(INLINE_CACHE_SECS)
        })
        .await?;
        Ok(())
    }
}

fn to_inline_query_result(result: &InlineResult) -> Option<InlineQueryResult> {
    let media: Url = result.media_url.parse().ok()?;
    let thumb: Url = result.thumb_url.parse().ok()?;

    Some(match result.kind {
        InlineKind::Gif => InlineQueryResult::Gif(
            InlineQueryResultGif::new(result.id.clone(), media, thumb)
                .gif_width(result.width as i32)
                .gif_height(result.height as i32)
                .caption(result.caption.clone()),
        ),
        InlineKind::Photo => InlineQueryResult::Photo(
            InlineQueryResultPhoto::new(result.id.clone(), media, thumb)
                .photo_width(result.width as i32)
                .photo_height(result.height as i32)
                .caption(result.caption.clone()),
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(kind: InlineKind, media: &str) -> InlineResult {
        InlineResult {
            id: "1".to_string(),
            kind,
            media_url: media.to_string(),
            thumb_url: "https://cdn.example/t.png".to_string(),
            width: 800,
            height: 600,
            caption: "https://example.org/1".to_string(),
        }
    }

    #[test]
    fn photo_results_map_to_photo_variant() {
        let mapped =
            to_inline_query_result(&result(InlineKind::Photo, "https://cdn.example/a.png"));
        assert!(matches!(mapped, Some(InlineQueryResult::Photo(_))));
    }

    #[test]
    fn gif_results_map_to_gif_variant() {
        let mapped = to_inline_query_result(&result(InlineKind::Gif, "https://cdn.example/a.gif"));
        assert!(matches!(mapped, Some(InlineQueryResult::Gif(_))));
    }

    #[test]
    fn unparseable_media_urls_are_skipped() {
        assert!(to_inline_query_result(&result(InlineKind::Photo, "not a url")).is_none());
    }
}

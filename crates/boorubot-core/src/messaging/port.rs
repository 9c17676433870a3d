use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageId, MessageRef},
    messaging::types::{ChatAction, InlineResult, PhotoPayload},
    Result,
};

/// Cross-messenger port.
///
/// Telegram is the first implementation; the shape is narrow on purpose so
/// other transports can fit behind the same interface.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        reply_to: Option<MessageId>,
        disable_preview: bool,
    ) -> Result<MessageRef>;

    async fn send_photo(
        &self,
        chat_id: ChatId,
        photo: PhotoPayload,
        reply_to: Option<MessageId>,
    ) -> Result<MessageRef>;

    async fn send_chat_action(&self, chat_id: ChatId, action: ChatAction) -> Result<()>;

    async fn answer_inline_query(&self, query_id: &str, results: Vec<InlineResult>) -> Result<()>;
}

use crate::domain::{ChatId, MessageId};

/// Cross-messenger inbound model.
///
/// Transport-specific fields stay in the adapter; the dispatcher only sees
/// what it needs to run one request.
#[derive(Clone, Debug)]
pub enum Inbound {
    Command(CommandMessage),
    Inline(InlineQueryRequest),
}

/// A chat message that matched the command shape (`/trigger [terms...]`).
#[derive(Clone, Debug)]
pub struct CommandMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    /// First name of the sender, for the "no images" reply.
    pub first_name: String,
    /// Lowercase trigger, without slash or bot mention.
    pub trigger: String,
    /// Trailing text after the trigger.
    pub args: String,
}

#[derive(Clone, Debug)]
pub struct InlineQueryRequest {
    pub id: String,
    pub query: String,
}

/// Outgoing presence indicator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatAction {
    Typing,
    UploadPhoto,
}

/// Binary attachment relayed to the user.
#[derive(Clone, Debug)]
pub struct PhotoPayload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub caption: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InlineKind {
    Photo,
    Gif,
}

/// One inline query answer item.
#[derive(Clone, Debug)]
pub struct InlineResult {
    pub id: String,
    pub kind: InlineKind,
    pub media_url: String,
    pub thumb_url: String,
    pub width: u32,
    pub height: u32,
    pub caption: String,
}

/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this taxonomy so the
/// dispatcher can turn every per-request failure into exactly one
/// user-visible message, and the polling loop can tell transport faults
/// apart from everything else.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    /// The catalog was unreachable, answered with a bad status, or the body
    /// could not be parsed as the expected structured format.
    #[error("{catalog}: unreachable or unparseable response: {reason}")]
    TransientUpstream { catalog: String, reason: String },

    /// The catalog answered with an explicit failure payload.
    #[error("{catalog} reported an error: {reason}")]
    UpstreamReported { catalog: String, reason: String },

    /// Fetching the binary image payload failed (distinct from a listing
    /// query failure: the listing was fine, the CDN download was not).
    #[error("{catalog}: image download failed: {reason}")]
    Download { catalog: String, reason: String },

    /// The messaging collaborator rejected an outbound send.
    #[error("send failed: {0}")]
    Send(String),

    /// The inbound-listening connection itself failed.
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

pub type Result<T> = std::result::Result<T, Error>;

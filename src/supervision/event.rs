//! Host-facing seam: what the plugin reads from an incoming message and
//! what it hands back for the channel to deliver.

use std::path::PathBuf;

/// One incoming chat message, as seen by the plugin.
///
/// Channels implement this on their native message type.
pub trait MessageEvent: Send + Sync {
    fn sender_id(&self) -> &str;

    /// `None` for private chats; reactions only fire in groups.
    fn group_id(&self) -> Option<&str>;

    /// The bot's own id on this platform.
    fn self_id(&self) -> &str;

    /// Plain text of the message, without structured segments.
    fn text(&self) -> &str;

    /// Ids carried as structured mentions (not literal `@123` text).
    fn mentions(&self) -> &[String];

    /// Whether the platform can deliver a poke gesture.
    fn supports_poke(&self) -> bool {
        false
    }
}

/// A single outgoing action for the channel to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Plain text reply into the same conversation.
    Text(String),
    /// Mention `user_id` and attach the image at `image`.
    MentionImage { user_id: String, image: PathBuf },
    /// Poke `user_id` inside `group_id`.
    Poke { user_id: String, group_id: String },
}

//! Events exchanged with the chat platform.
//!
//! The platform client (or the console transport) converts its own message and reaction
//! callbacks into [`InboundEvent`]s and executes the [`Outbound`] actions the server
//! emits. Delivery of outbound actions is best effort.
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEvent {
    pub author_id: String,
    pub author_is_bot: bool,
    /// Channel (or guild channel) the message was posted in.
    pub channel: String,
    /// Direct messages are not treated as commands.
    pub is_direct: bool,
    pub content: String,
}

impl TextEvent {
    pub fn new(author_id: impl Into<String>, channel: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            author_id: author_id.into(),
            author_is_bot: false,
            channel: channel.into(),
            is_direct: false,
            content: content.into(),
        }
    }
}

/// A reaction added by `user_id` to one of the bot's prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEvent {
    pub user_id: String,
    pub channel: String,
    pub emoji: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Text(TextEvent),
    Reaction(ReactionEvent),
}

/// Answer to a pending prompt, from a reaction or a text command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Accept,
    Decline,
}

impl Signal {
    pub fn from_emoji(emoji: &str) -> Option<Self> {
        match emoji {
            "✅" | "⚔️" | "⚔" => Some(Signal::Accept),
            "❌" => Some(Signal::Decline),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Moderation {
    Ban { user_id: String, reason: String },
    Kick { user_id: String, reason: String },
    /// Bulk-delete recent messages in a channel, optionally only from one user.
    Clear {
        channel: String,
        count: u32,
        user_id: Option<String>,
    },
}

impl fmt::Display for Moderation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Moderation::Ban { user_id, reason } => write!(f, "ban {} ({})", user_id, reason),
            Moderation::Kick { user_id, reason } => write!(f, "kick {} ({})", user_id, reason),
            Moderation::Clear {
                channel,
                count,
                user_id,
            } => match user_id {
                Some(u) => write!(f, "clear {} messages from {} in {}", count, u, channel),
                None => write!(f, "clear {} messages in {}", count, channel),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Reply { channel: String, text: String },
    Direct { user_id: String, text: String },
    Moderate(Moderation),
}

impl Outbound {
    /// Destination key used for logging and the captured test transcript.
    pub fn target(&self) -> String {
        match self {
            Outbound::Reply { channel, .. } => channel.clone(),
            Outbound::Direct { user_id, .. } => format!("dm:{}", user_id),
            Outbound::Moderate(_) => "moderation".to_string(),
        }
    }

    pub fn text(&self) -> String {
        match self {
            Outbound::Reply { text, .. } | Outbound::Direct { text, .. } => text.clone(),
            Outbound::Moderate(m) => m.to_string(),
        }
    }
}

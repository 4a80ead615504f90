use teloxide::types::Message;

/// Max characters of payload text kept for the broadcast history.
const SNIPPET_LIMIT: usize = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatCategory {
    Channel,
    Group,
    Supergroup,
}

impl ChatCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatCategory::Channel => "channel",
            ChatCategory::Group => "group",
            ChatCategory::Supergroup => "supergroup",
        }
    }

    pub fn from_str(s: &str) -> Option<ChatCategory> {
        match s {
            "channel" => Some(ChatCategory::Channel),
            "group" => Some(ChatCategory::Group),
            "supergroup" => Some(ChatCategory::Supergroup),
            _ => None,
        }
    }
}

/// A chat the bot can deliver to. Snapshot of a `chats` row; the broadcast
/// engine never writes these back.
#[derive(Clone, Debug, PartialEq)]
pub struct Destination {
    pub chat_id: i64,
    pub category: ChatCategory,
    pub title: String,
    pub username: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendMode {
    Copy,
    Forward,
}

impl SendMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SendMode::Copy => "copy",
            SendMode::Forward => "forward",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadKind {
    Text,
    Photo,
    Video,
    Document,
    Audio,
    Voice,
    VideoNote,
    Sticker,
}

impl PayloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::Text => "text",
            PayloadKind::Photo => "photo",
            PayloadKind::Video => "video",
            PayloadKind::Document => "document",
            PayloadKind::Audio => "audio",
            PayloadKind::Voice => "voice",
            PayloadKind::VideoNote => "video_note",
            PayloadKind::Sticker => "sticker",
        }
    }
}

/// A single validated broadcast message. Albums are rejected upstream, so a
/// payload always refers to exactly one Telegram message.
#[derive(Clone, Debug, PartialEq)]
pub struct Payload {
    pub source_chat: i64,
    pub message_id: i32,
    pub kind: PayloadKind,
    pub snippet: Option<String>,
}

impl Payload {
    /// Classifies a captured operator message. Returns `None` for message
    /// kinds the broadcast does not support (polls, locations, etc.).
    pub fn from_message(msg: &Message) -> Option<Payload> {
        let kind = if msg.text().is_some() {
            PayloadKind::Text
        } else if msg.photo().is_some() {
            PayloadKind::Photo
        } else if msg.video().is_some() {
            PayloadKind::Video
        } else if msg.document().is_some() {
            PayloadKind::Document
        } else if msg.audio().is_some() {
            PayloadKind::Audio
        } else if msg.voice().is_some() {
            PayloadKind::Voice
        } else if msg.video_note().is_some() {
            PayloadKind::VideoNote
        } else if msg.sticker().is_some() {
            PayloadKind::Sticker
        } else {
            return None;
        };

        let snippet = msg
            .text()
            .or_else(|| msg.caption())
            .map(|t| t.chars().take(SNIPPET_LIMIT).collect());

        Some(Payload {
            source_chat: msg.chat.id.0,
            message_id: msg.id.0,
            kind,
            snippet,
        })
    }
}

/// Per-destination delivery classification. Only the aggregate tally is ever
/// shown to the operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Denied,
    Unreachable,
    TimedOut,
    Malformed,
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }
}

/// Aggregate result of one dispatcher run. `success + failed == total` holds
/// for every run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatchReport {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trip() {
        for cat in [
            ChatCategory::Channel,
            ChatCategory::Group,
            ChatCategory::Supergroup,
        ] {
            assert_eq!(ChatCategory::from_str(cat.as_str()), Some(cat));
        }
        assert_eq!(ChatCategory::from_str("private"), None);
    }

    #[test]
    fn outcome_success_classification() {
        assert!(DeliveryOutcome::Delivered.is_success());
        assert!(!DeliveryOutcome::Denied.is_success());
        assert!(!DeliveryOutcome::Unreachable.is_success());
        assert!(!DeliveryOutcome::TimedOut.is_success());
        assert!(!DeliveryOutcome::Malformed.is_success());
    }
}

use std::time::Duration;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::MessageId;
use teloxide::{ApiError, RequestError};

use crate::broadcast::types::{DeliveryOutcome, Payload};

/// Upper bound on one outbound send so a hung destination cannot stall the
/// whole batch.
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Classified failure of a single send attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendError {
    Denied,
    Unreachable,
    TimedOut,
    Malformed,
}

impl SendError {
    pub fn outcome(&self) -> DeliveryOutcome {
        match self {
            SendError::Denied => DeliveryOutcome::Denied,
            SendError::Unreachable => DeliveryOutcome::Unreachable,
            SendError::TimedOut => DeliveryOutcome::TimedOut,
            SendError::Malformed => DeliveryOutcome::Malformed,
        }
    }
}

/// Outbound side of the chat platform, one call per destination.
#[async_trait]
pub trait OutboundClient: Send + Sync {
    /// Re-emits the payload as a new message, stripping forwarding
    /// provenance.
    async fn send_copy(&self, destination: i64, payload: &Payload) -> Result<(), SendError>;

    /// Re-transmits the original message, preserving forwarding metadata.
    async fn send_forward(&self, destination: i64, payload: &Payload) -> Result<(), SendError>;
}

/// Telegram Bot API implementation. Copy mode uses `copyMessage`, which
/// handles every supported payload kind and drops the forward header.
pub struct TelegramOutbound {
    bot: Bot,
}

impl TelegramOutbound {
    pub fn new(bot: Bot) -> Self {
        TelegramOutbound { bot }
    }
}

#[async_trait]
impl OutboundClient for TelegramOutbound {
    async fn send_copy(&self, destination: i64, payload: &Payload) -> Result<(), SendError> {
        let request = self.bot.copy_message(
            ChatId(destination),
            ChatId(payload.source_chat),
            MessageId(payload.message_id),
        );

        match tokio::time::timeout(SEND_TIMEOUT, async { request.await }).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(classify_request_error(&e)),
            Err(_) => Err(SendError::TimedOut),
        }
    }

    async fn send_forward(&self, destination: i64, payload: &Payload) -> Result<(), SendError> {
        let request = self.bot.forward_message(
            ChatId(destination),
            ChatId(payload.source_chat),
            MessageId(payload.message_id),
        );

        match tokio::time::timeout(SEND_TIMEOUT, async { request.await }).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(classify_request_error(&e)),
            Err(_) => Err(SendError::TimedOut),
        }
    }
}

/// Maps a Telegram API failure onto the delivery taxonomy. Permission-style
/// rejections mean the bot was blocked, kicked or demoted in that chat;
/// missing or deactivated chats are unreachable; everything else is treated
/// as a malformed request for that destination.
fn classify_request_error(err: &RequestError) -> SendError {
    match err {
        RequestError::Api(api) => match api {
            ApiError::BotBlocked
            | ApiError::BotKicked
            | ApiError::BotKickedFromSupergroup
            | ApiError::NotEnoughRightsToPostMessages
            | ApiError::CantInitiateConversation => SendError::Denied,
            ApiError::ChatNotFound | ApiError::UserNotFound | ApiError::GroupDeactivated => {
                SendError::Unreachable
            }
            _ => SendError::Malformed,
        },
        RequestError::Network(_) | RequestError::Io(_) => SendError::Unreachable,
        _ => SendError::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_errors_are_denied() {
        for api in [
            ApiError::BotBlocked,
            ApiError::BotKicked,
            ApiError::BotKickedFromSupergroup,
            ApiError::NotEnoughRightsToPostMessages,
            ApiError::CantInitiateConversation,
        ] {
            assert_eq!(
                classify_request_error(&RequestError::Api(api)),
                SendError::Denied
            );
        }
    }

    #[test]
    fn missing_chats_are_unreachable() {
        for api in [
            ApiError::ChatNotFound,
            ApiError::UserNotFound,
            ApiError::GroupDeactivated,
        ] {
            assert_eq!(
                classify_request_error(&RequestError::Api(api)),
                SendError::Unreachable
            );
        }
    }

    #[test]
    fn other_api_errors_are_malformed() {
        assert_eq!(
            classify_request_error(&RequestError::Api(ApiError::MessageTextIsEmpty)),
            SendError::Malformed
        );
    }
}

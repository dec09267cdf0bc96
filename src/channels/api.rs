//! Chat API Trait
//!
//! Outbound actions and lookups the moderation bot needs from a chat platform.

use async_trait::async_trait;

use super::types::{InlineKeyboardMarkup, Message};
use crate::polls::{ChatId, MessageId, UserId};

/// Result type for chat operations
pub type ChatResult<T> = Result<T, ChatError>;

/// Errors that can occur in chat operations
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {code}: {description}")]
    Api { code: i64, description: String },

    #[error("Rate limited: retry after {0}s")]
    RateLimited(u64),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Chat platform capabilities used by the bot
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Send a text message, optionally with an inline keyboard
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        markup: Option<InlineKeyboardMarkup>,
    ) -> ChatResult<Message>;

    /// Replace the inline keyboard of a message (`None` removes it)
    async fn edit_message_markup(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        markup: Option<InlineKeyboardMarkup>,
    ) -> ChatResult<()>;

    /// Replace the text of a message and its keyboard
    async fn edit_message_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        markup: Option<InlineKeyboardMarkup>,
    ) -> ChatResult<()>;

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> ChatResult<()>;

    /// Acknowledge a button press, optionally with a toast
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> ChatResult<()>;

    async fn ban_member(&self, chat_id: ChatId, user_id: UserId) -> ChatResult<()>;

    /// User ids of the chat's administrators
    async fn administrators(&self, chat_id: ChatId) -> ChatResult<Vec<UserId>>;
}

/// Handler for inbound updates
#[async_trait]
pub trait UpdateHandler: Send + Sync {
    /// Handle one update; errors are the handler's to log
    async fn handle_update(&self, update: super::types::Update);
}

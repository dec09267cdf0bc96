//! Chat channels
//!
//! The [`ChatApi`] seam between the moderation bot and a chat platform, and
//! its Telegram implementation.

pub mod api;
pub mod telegram;
pub mod types;

pub use api::{ChatApi, ChatError, ChatResult, UpdateHandler};
pub use telegram::{run_long_polling, TelegramClient, TelegramConfig};
pub use types::{
    CallbackQuery, Chat, ChatMember, InlineKeyboardButton, InlineKeyboardMarkup, Message, Update,
    User,
};

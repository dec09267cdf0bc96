//! votekick library
//!
//! Timed ban votes for Telegram group chats: the poll engine, the Telegram
//! channel, per-chat settings and the moderation bot tying them together.

pub mod channels;
pub mod cli;
pub mod config;
pub mod logging;
pub mod moderation;
pub mod polls;
pub mod settings;

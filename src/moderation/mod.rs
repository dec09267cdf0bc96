//! Moderation bot
//!
//! Routes chat commands and button presses to the poll engine:
//! - `/start` activates the bot in a chat (admins only)
//! - `/ban`, sent as a reply, opens a ban vote against the replied-to author
//! - `/menu` shows the settings menu (admins only)
//! - `poll:*` buttons cast or retract votes, `menu:*` buttons show settings

pub mod commands;
pub mod render;
pub mod sink;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::channels::{CallbackQuery, ChatApi, ChatError, Message, Update, UpdateHandler, User};
use crate::polls::{ChatId, PollEngine, PollError, PollKey, PollRequest, UserId, VoteOption};
use crate::settings::{SettingsError, SettingsStore};

pub use commands::{CallbackAction, Command, MenuAction};
pub use sink::BanSink;

/// Errors raised while handling an update
#[derive(Debug, thiserror::Error)]
pub enum ModerationError {
    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Chat-facing side of the moderation poll engine
pub struct ModerationBot {
    api: Arc<dyn ChatApi>,
    engine: Arc<PollEngine>,
    settings: Arc<SettingsStore>,
    vote_duration: Duration,
    bot_username: Option<String>,
}

impl ModerationBot {
    pub fn new(
        api: Arc<dyn ChatApi>,
        engine: Arc<PollEngine>,
        settings: Arc<SettingsStore>,
        vote_duration: Duration,
    ) -> Self {
        Self {
            api,
            engine,
            settings,
            vote_duration,
            bot_username: None,
        }
    }

    /// Only accept `/command@name` addressed to this username
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = Some(username.into());
        self
    }

    /// Handle a chat message
    pub async fn on_message(&self, message: &Message) -> Result<(), ModerationError> {
        let (Some(text), Some(from)) = (message.text.as_deref(), message.from.as_ref()) else {
            return Ok(());
        };
        let Some(command) = Command::parse(text, self.bot_username.as_deref()) else {
            return Ok(());
        };

        debug!(chat_id = message.chat.id, user_id = from.id, ?command, "command received");
        match command {
            Command::Start => self.handle_start(message, from).await,
            Command::Ban => self.handle_ban(message, from).await,
            Command::Menu => self.handle_menu(message, from).await,
        }
    }

    /// Handle a button press
    pub async fn on_callback(&self, callback: &CallbackQuery) -> Result<(), ModerationError> {
        let Some(data) = callback.data.as_deref() else {
            return Ok(());
        };

        match CallbackAction::parse(data) {
            CallbackAction::Vote(option) => self.handle_vote(callback, option).await,
            CallbackAction::Menu(action) => self.handle_menu_callback(callback, action).await,
            CallbackAction::UnknownMenu(_) => {
                self.api
                    .answer_callback(&callback.id, Some(render::UNKNOWN_MENU_COMMAND))
                    .await?;
                Ok(())
            }
            CallbackAction::Unknown => {
                self.api
                    .answer_callback(&callback.id, Some(render::UNKNOWN_COMMAND))
                    .await?;
                Ok(())
            }
        }
    }

    async fn is_admin(&self, chat_id: ChatId, user_id: UserId) -> Result<bool, ModerationError> {
        let admins = self.api.administrators(chat_id).await?;
        Ok(admins.contains(&user_id))
    }

    async fn handle_start(&self, message: &Message, from: &User) -> Result<(), ModerationError> {
        let chat_id = message.chat.id;
        if !self.is_admin(chat_id, from.id).await? {
            return Ok(());
        }

        // The store writes its file synchronously.
        let settings = Arc::clone(&self.settings);
        if tokio::task::spawn_blocking(move || settings.ensure(chat_id)).await?? {
            info!(chat_id, "bot activated in new chat");
        }
        self.api
            .send_message(chat_id, render::BOT_ACTIVATED, None)
            .await?;
        Ok(())
    }

    async fn handle_menu(&self, message: &Message, from: &User) -> Result<(), ModerationError> {
        let chat_id = message.chat.id;
        if !self.is_admin(chat_id, from.id).await? {
            return Ok(());
        }

        self.api
            .send_message(chat_id, render::MENU_TEXT, Some(render::menu_keyboard()))
            .await?;
        Ok(())
    }

    async fn handle_ban(&self, message: &Message, from: &User) -> Result<(), ModerationError> {
        let Some(target) = message
            .reply_to_message
            .as_ref()
            .and_then(|reply| reply.from.as_ref())
        else {
            return Ok(());
        };
        let chat_id = message.chat.id;

        if target.id == from.id {
            self.api
                .send_message(chat_id, render::SELF_BAN_REFUSED, None)
                .await?;
            return Ok(());
        }

        if self.is_admin(chat_id, target.id).await? {
            self.api
                .send_message(chat_id, render::ADMIN_BAN_REFUSED, None)
                .await?;
            return Ok(());
        }

        let subject = target.participant();
        let initiator = from.participant();
        let announcement = self
            .api
            .send_message(
                chat_id,
                &render::poll_announcement(&initiator, &subject),
                Some(render::poll_keyboard(Default::default())),
            )
            .await?;

        let settings = self.settings.get(chat_id);
        let key = PollKey::new(chat_id, announcement.message_id);
        let mut request = PollRequest::new(key, subject, initiator, self.vote_duration);
        if let Some(policy) = settings.ban_policy() {
            request = request.with_policy(policy);
        }

        match self.engine.open_poll(request) {
            Ok(handle) => {
                info!(poll = %handle.key, closes_at = %handle.closes_at, "ban vote started");
            }
            Err(PollError::DuplicatePoll(key)) => {
                self.api
                    .edit_message_text(key.chat_id, key.message_id, render::POLL_ALREADY_RUNNING, None)
                    .await?;
                return Ok(());
            }
            Err(e) => {
                warn!(poll = %key, error = %e, "failed to open ban vote");
                self.api
                    .edit_message_text(key.chat_id, key.message_id, render::GENERIC_ERROR, None)
                    .await?;
                return Ok(());
            }
        }

        if settings.delete_message {
            if let Err(e) = self.api.delete_message(chat_id, message.message_id).await {
                warn!(chat_id, message_id = message.message_id, error = %e, "failed to delete command message");
            }
        }
        Ok(())
    }

    async fn handle_vote(
        &self,
        callback: &CallbackQuery,
        option: VoteOption,
    ) -> Result<(), ModerationError> {
        let Some(message) = callback.message.as_ref() else {
            self.api
                .answer_callback(&callback.id, Some(render::POLL_CLOSED))
                .await?;
            return Ok(());
        };
        let key = PollKey::new(message.chat.id, message.message_id);

        match self.engine.cast_vote(key, callback.from.id, option) {
            Ok(counts) => {
                // Prefer the freshest counts; concurrent voters edit the same keyboard.
                let counts = self.engine.current_counts(key).unwrap_or(counts);
                if let Err(e) = self
                    .api
                    .edit_message_markup(key.chat_id, key.message_id, Some(render::poll_keyboard(counts)))
                    .await
                {
                    debug!(poll = %key, error = %e, "failed to refresh poll keyboard");
                }
                self.api.answer_callback(&callback.id, None).await?;
            }
            Err(_) => {
                self.api
                    .answer_callback(&callback.id, Some(render::POLL_CLOSED))
                    .await?;
            }
        }
        Ok(())
    }

    async fn handle_menu_callback(
        &self,
        callback: &CallbackQuery,
        action: MenuAction,
    ) -> Result<(), ModerationError> {
        let text = match callback.message.as_ref() {
            Some(message) => render::menu_answer(action, &self.settings.get(message.chat.id)),
            None => render::UNKNOWN_MENU_COMMAND.to_string(),
        };
        self.api.answer_callback(&callback.id, Some(&text)).await?;
        Ok(())
    }
}

#[async_trait]
impl UpdateHandler for ModerationBot {
    async fn handle_update(&self, update: Update) {
        if let Some(message) = &update.message {
            if let Err(e) = self.on_message(message).await {
                warn!(update_id = update.update_id, error = %e, "failed to handle message");
            }
        }

        if let Some(callback) = &update.callback_query {
            if let Err(e) = self.on_callback(callback).await {
                warn!(update_id = update.update_id, error = %e, "failed to handle callback");
                if let Err(e) = self
                    .api
                    .answer_callback(&callback.id, Some(render::GENERIC_ERROR))
                    .await
                {
                    debug!(error = %e, "failed to answer callback after error");
                }
            }
        }
    }
}

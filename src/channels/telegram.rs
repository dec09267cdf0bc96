//! Telegram Channel
//!
//! Bot API client over reqwest, plus the `getUpdates` long-polling loop that
//! feeds inbound updates to an [`UpdateHandler`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::api::{ChatApi, ChatError, ChatResult, UpdateHandler};
use super::types::{ChatMember, InlineKeyboardMarkup, Message, Update, User};
use crate::polls::{ChatId, MessageId, UserId};

/// Default Bot API endpoint
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Pause after a failed `getUpdates` before trying again
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Telegram channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelegramConfig {
    /// Bot token from BotFather
    pub bot_token: String,
    /// Bot API base URL
    pub api_url: String,
    /// Long-poll timeout passed to `getUpdates`
    pub poll_timeout_secs: u64,
    /// Timeout for ordinary API calls
    pub request_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            poll_timeout_secs: 30,
            request_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    retry_after: Option<u64>,
}

/// `{ ok, result, description, ... }` envelope around every Bot API reply
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i64>,
    parameters: Option<ResponseParameters>,
}

impl<T> ApiEnvelope<T> {
    fn into_result(self) -> ChatResult<T> {
        if !self.ok {
            let code = self.error_code.unwrap_or_default();
            if let Some(retry_after) = self.parameters.and_then(|p| p.retry_after) {
                return Err(ChatError::RateLimited(retry_after));
            }
            return Err(ChatError::Api {
                code,
                description: self
                    .description
                    .unwrap_or_else(|| "Unknown error".to_string()),
            });
        }

        self.result
            .ok_or_else(|| ChatError::Parse("response has no result".to_string()))
    }
}

/// Telegram Bot API client
#[derive(Debug, Clone)]
pub struct TelegramClient {
    config: TelegramConfig,
    client: reqwest::Client,
}

impl TelegramClient {
    /// Create a new client
    pub fn new(config: TelegramConfig) -> ChatResult<Self> {
        if config.bot_token.trim().is_empty() {
            return Err(ChatError::InvalidConfig(
                "Bot token is required".to_string(),
            ));
        }

        // Must outlive the long-poll timeout or every getUpdates would abort.
        let timeout = Duration::from_secs(config.request_timeout_secs + config.poll_timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatError::InvalidConfig(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Get the URL of a Bot API method
    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.bot_token,
            method
        )
    }

    /// Call a Bot API method with a JSON body
    async fn call<T: DeserializeOwned>(&self, method: &str, body: Value) -> ChatResult<T> {
        debug!(method, "Telegram API request");

        let response = self
            .client
            .post(self.method_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|e| ChatError::Parse(e.to_string()))?;

        envelope.into_result()
    }

    /// Identity of the bot behind the token
    pub async fn get_me(&self) -> ChatResult<User> {
        self.call("getMe", json!({})).await
    }

    /// Fetch updates starting at `offset`, waiting up to the poll timeout
    pub async fn get_updates(&self, offset: i64) -> ChatResult<Vec<Update>> {
        self.call(
            "getUpdates",
            json!({
                "offset": offset,
                "timeout": self.config.poll_timeout_secs,
                "allowed_updates": ["message", "callback_query"],
            }),
        )
        .await
    }
}

#[async_trait]
impl ChatApi for TelegramClient {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        markup: Option<InlineKeyboardMarkup>,
    ) -> ChatResult<Message> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(markup) = markup {
            body["reply_markup"] = json!(markup);
        }
        self.call("sendMessage", body).await
    }

    async fn edit_message_markup(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        markup: Option<InlineKeyboardMarkup>,
    ) -> ChatResult<()> {
        let mut body = json!({
            "chat_id": chat_id,
            "message_id": message_id,
        });
        if let Some(markup) = markup {
            body["reply_markup"] = json!(markup);
        }
        self.call::<Value>("editMessageReplyMarkup", body).await?;
        Ok(())
    }

    async fn edit_message_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        markup: Option<InlineKeyboardMarkup>,
    ) -> ChatResult<()> {
        let mut body = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
        });
        if let Some(markup) = markup {
            body["reply_markup"] = json!(markup);
        }
        self.call::<Value>("editMessageText", body).await?;
        Ok(())
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> ChatResult<()> {
        self.call::<Value>(
            "deleteMessage",
            json!({ "chat_id": chat_id, "message_id": message_id }),
        )
        .await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> ChatResult<()> {
        let mut body = json!({ "callback_query_id": callback_id });
        if let Some(text) = text {
            body["text"] = json!(text);
        }
        self.call::<Value>("answerCallbackQuery", body).await?;
        Ok(())
    }

    async fn ban_member(&self, chat_id: ChatId, user_id: UserId) -> ChatResult<()> {
        self.call::<Value>(
            "banChatMember",
            json!({ "chat_id": chat_id, "user_id": user_id }),
        )
        .await?;
        Ok(())
    }

    async fn administrators(&self, chat_id: ChatId) -> ChatResult<Vec<UserId>> {
        let members: Vec<ChatMember> = self
            .call("getChatAdministrators", json!({ "chat_id": chat_id }))
            .await?;
        Ok(members.into_iter().map(|m| m.user.id).collect())
    }
}

/// Run the `getUpdates` loop until `shutdown` is cancelled.
///
/// Each update is handled on its own task so slow handlers never hold up
/// polling and concurrent votes really are concurrent.
pub async fn run_long_polling(
    client: Arc<TelegramClient>,
    handler: Arc<dyn UpdateHandler>,
    shutdown: CancellationToken,
) {
    let mut offset = 0;
    info!("Telegram long polling started");

    loop {
        let result = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = client.get_updates(offset) => result,
        };

        let backoff = match result {
            Ok(updates) => {
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    let handler = Arc::clone(&handler);
                    tokio::spawn(async move {
                        handler.handle_update(update).await;
                    });
                }
                continue;
            }
            Err(ChatError::RateLimited(secs)) => {
                warn!(retry_after = secs, "Telegram rate limit hit while polling");
                Duration::from_secs(secs)
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch Telegram updates");
                ERROR_BACKOFF
            }
        };

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(backoff) => {}
        }
    }

    info!("Telegram long polling stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> TelegramConfig {
        TelegramConfig {
            bot_token: "123:abc".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_requires_token() {
        let result = TelegramClient::new(TelegramConfig::default());
        assert!(matches!(result, Err(ChatError::InvalidConfig(_))));
    }

    #[test]
    fn test_method_url() {
        let mut config = create_test_config();
        config.api_url = "http://localhost:8081/".to_string();
        let client = TelegramClient::new(config).unwrap();

        assert_eq!(
            client.method_url("sendMessage"),
            "http://localhost:8081/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn test_envelope_ok() {
        let envelope: ApiEnvelope<Vec<Update>> =
            serde_json::from_str(r#"{"ok": true, "result": [{"update_id": 4}]}"#).unwrap();
        let updates = envelope.into_result().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].update_id, 4);
    }

    #[test]
    fn test_envelope_api_error() {
        let envelope: ApiEnvelope<Value> = serde_json::from_str(
            r#"{"ok": false, "error_code": 400, "description": "Bad Request: not enough rights"}"#,
        )
        .unwrap();

        match envelope.into_result() {
            Err(ChatError::Api { code, description }) => {
                assert_eq!(code, 400);
                assert!(description.contains("not enough rights"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_envelope_rate_limited() {
        let envelope: ApiEnvelope<Value> = serde_json::from_str(
            r#"{"ok": false, "error_code": 429, "description": "Too Many Requests", "parameters": {"retry_after": 7}}"#,
        )
        .unwrap();

        assert!(matches!(envelope.into_result(), Err(ChatError::RateLimited(7))));
    }

    #[test]
    fn test_config_defaults() {
        let config: TelegramConfig = serde_json::from_str(r#"{"botToken": "t"}"#).unwrap();
        assert_eq!(config.bot_token, "t");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.poll_timeout_secs, 30);
    }
}

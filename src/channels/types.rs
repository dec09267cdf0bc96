//! Telegram wire types
//!
//! The subset of the Bot API objects the moderation bot reads and writes.

use serde::{Deserialize, Serialize};

use crate::polls::{ChatId, MessageId, Participant, UserId};

/// Incoming update from `getUpdates`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl User {
    pub fn participant(&self) -> Participant {
        Participant::new(self.id, self.first_name.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: MessageId,
    pub chat: Chat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_message: Option<Box<Message>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMember {
    pub user: User,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineKeyboardButton {
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: data.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

impl InlineKeyboardMarkup {
    /// One button per row
    pub fn single_column(buttons: Vec<InlineKeyboardButton>) -> Self {
        Self {
            inline_keyboard: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_callback_update() {
        let json = r#"{
            "update_id": 77,
            "callback_query": {
                "id": "cb1",
                "from": {"id": 5, "is_bot": false, "first_name": "Bob"},
                "message": {
                    "message_id": 12,
                    "chat": {"id": -100, "type": "supergroup"},
                    "text": "vote"
                },
                "data": "poll:Yes"
            }
        }"#;

        let update: Update = serde_json::from_str(json).unwrap();
        assert!(update.message.is_none());
        let callback = update.callback_query.unwrap();
        assert_eq!(callback.from.id, 5);
        assert_eq!(callback.data.as_deref(), Some("poll:Yes"));
        assert_eq!(callback.message.unwrap().chat.kind, "supergroup");
    }

    #[test]
    fn test_deserialize_reply_message() {
        let json = r#"{
            "message_id": 3,
            "chat": {"id": 1, "type": "group"},
            "from": {"id": 9, "first_name": "Alice"},
            "text": "/ban",
            "reply_to_message": {
                "message_id": 2,
                "chat": {"id": 1, "type": "group"},
                "from": {"id": 8, "first_name": "Mallory", "username": "mal"}
            }
        }"#;

        let message: Message = serde_json::from_str(json).unwrap();
        let reply = message.reply_to_message.unwrap();
        assert_eq!(reply.from.as_ref().unwrap().username.as_deref(), Some("mal"));
        assert_eq!(reply.from.unwrap().participant(), Participant::new(8, "Mallory"));
    }

    #[test]
    fn test_keyboard_serialization() {
        let markup = InlineKeyboardMarkup::single_column(vec![
            InlineKeyboardButton::callback("A", "poll:Yes"),
            InlineKeyboardButton::callback("B", "poll:No"),
        ]);
        let value = serde_json::to_value(&markup).unwrap();
        assert_eq!(value["inline_keyboard"][1][0]["callback_data"], "poll:No");
    }
}

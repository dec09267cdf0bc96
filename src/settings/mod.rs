//! Per-chat settings
//!
//! Moderation settings keyed by chat id, persisted as a JSON file.

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::polls::{ChatId, DecisionPolicy};

/// Settings store errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Settings I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Settings serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Moderation settings for one chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSettings {
    pub chat_id: ChatId,
    /// Delete the `/ban` command message once the poll is posted
    #[serde(default)]
    pub delete_message: bool,
    /// Mute length for mute votes
    #[serde(default)]
    pub mute_minutes: u32,
    /// Approvals required for a mute vote (0 = plain majority)
    #[serde(default)]
    pub vote_mute_limit: u32,
    /// Approvals required for a ban vote (0 = plain majority)
    #[serde(default)]
    pub vote_ban_limit: u32,
}

impl ChatSettings {
    pub fn new(chat_id: ChatId) -> Self {
        Self {
            chat_id,
            delete_message: false,
            mute_minutes: 0,
            vote_mute_limit: 0,
            vote_ban_limit: 0,
        }
    }

    /// Quorum policy for ban polls, if this chat sets an approval limit
    pub fn ban_policy(&self) -> Option<DecisionPolicy> {
        (self.vote_ban_limit > 0).then(|| DecisionPolicy::Quorum {
            min_approvals: self.vote_ban_limit,
        })
    }
}

/// Chat settings store
#[derive(Debug)]
pub struct SettingsStore {
    path: Option<PathBuf>,
    chats: RwLock<HashMap<ChatId, ChatSettings>>,
    /// Serializes file writes
    persist_lock: Mutex<()>,
}

impl SettingsStore {
    /// Open a file-backed store, starting empty if the file does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let chats = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|source| SettingsError::Io {
                path: path.clone(),
                source,
            })?;
            let records: Vec<ChatSettings> = serde_json::from_str(&content)?;
            records.into_iter().map(|s| (s.chat_id, s)).collect()
        } else {
            HashMap::new()
        };

        info!(path = %path.display(), chats = chats.len(), "chat settings loaded");
        Ok(Self {
            path: Some(path),
            chats: RwLock::new(chats),
            persist_lock: Mutex::new(()),
        })
    }

    /// Store that never touches disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            chats: RwLock::new(HashMap::new()),
            persist_lock: Mutex::new(()),
        }
    }

    /// Settings for `chat_id`, or defaults if the chat has none stored
    pub fn get(&self, chat_id: ChatId) -> ChatSettings {
        self.chats
            .read()
            .get(&chat_id)
            .cloned()
            .unwrap_or_else(|| ChatSettings::new(chat_id))
    }

    pub fn contains(&self, chat_id: ChatId) -> bool {
        self.chats.read().contains_key(&chat_id)
    }

    /// Create a default record for `chat_id` if missing. Returns true if created.
    pub fn ensure(&self, chat_id: ChatId) -> Result<bool, SettingsError> {
        let created = self.commit(ChatSettings::new(chat_id), false)?;
        if created {
            debug!(chat_id, "chat settings created");
        }
        Ok(created)
    }

    /// Insert or replace the settings of a chat
    pub fn upsert(&self, settings: ChatSettings) -> Result<(), SettingsError> {
        let chat_id = settings.chat_id;
        self.commit(settings, true)?;
        debug!(chat_id, "chat settings saved");
        Ok(())
    }

    /// All stored settings, ordered by chat id
    pub fn list(&self) -> Vec<ChatSettings> {
        sorted(&self.chats.read())
    }

    /// Write the updated set to disk, then publish it in memory.
    ///
    /// Returns false when `replace` is off and the chat already has a record.
    fn commit(&self, settings: ChatSettings, replace: bool) -> Result<bool, SettingsError> {
        let _guard = self.persist_lock.lock();

        let mut next = self.chats.read().clone();
        if !replace && next.contains_key(&settings.chat_id) {
            return Ok(false);
        }
        next.insert(settings.chat_id, settings);

        self.persist(&next)?;
        *self.chats.write() = next;
        Ok(true)
    }

    /// Caller holds `persist_lock`.
    fn persist(&self, chats: &HashMap<ChatId, ChatSettings>) -> Result<(), SettingsError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let io_err = |source| SettingsError::Io {
            path: path.clone(),
            source,
        };

        let content = serde_json::to_string_pretty(&sorted(chats))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let tmp_path = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp_path).map_err(io_err)?;
            file.write_all(content.as_bytes()).map_err(io_err)?;
            file.write_all(b"\n").map_err(io_err)?;
        }
        fs::rename(&tmp_path, path).map_err(io_err)?;
        Ok(())
    }
}

fn sorted(chats: &HashMap<ChatId, ChatSettings>) -> Vec<ChatSettings> {
    let mut all: Vec<ChatSettings> = chats.values().cloned().collect();
    all.sort_by_key(|s| s.chat_id);
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_get_defaults_for_unknown_chat() {
        let store = SettingsStore::in_memory();
        let settings = store.get(-42);
        assert_eq!(settings, ChatSettings::new(-42));
        assert!(!store.contains(-42));
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let store = SettingsStore::in_memory();
        assert!(store.ensure(1).unwrap());
        assert!(!store.ensure(1).unwrap());
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_ensure_keeps_existing_values() {
        let store = SettingsStore::in_memory();
        let mut settings = ChatSettings::new(1);
        settings.vote_ban_limit = 4;
        store.upsert(settings.clone()).unwrap();

        store.ensure(1).unwrap();
        assert_eq!(store.get(1), settings);
    }

    #[test]
    fn test_persists_across_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("settings.json");

        let store = SettingsStore::open(&path).unwrap();
        let mut settings = ChatSettings::new(-100200);
        settings.delete_message = true;
        settings.vote_ban_limit = 3;
        store.upsert(settings.clone()).unwrap();
        store.ensure(7).unwrap();

        let reopened = SettingsStore::open(&path).unwrap();
        assert_eq!(reopened.get(-100200), settings);
        assert!(reopened.contains(7));
        assert_eq!(reopened.list().len(), 2);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_failed_write_leaves_memory_untouched() {
        let tmp = TempDir::new().unwrap();
        // A regular file where the settings directory should be.
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let path = blocker.join("settings.json");

        let store = SettingsStore::open(&path).unwrap();
        assert!(matches!(store.ensure(5), Err(SettingsError::Io { .. })));
        assert!(!store.contains(5));

        // A retry fails again instead of reporting the chat as known.
        assert!(store.ensure(5).is_err());
        assert!(!store.contains(5));

        let mut settings = ChatSettings::new(6);
        settings.vote_ban_limit = 2;
        assert!(store.upsert(settings).is_err());
        assert_eq!(store.get(6), ChatSettings::new(6));
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_open_rejects_corrupt_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, "not json").unwrap();

        let result = SettingsStore::open(&path);
        assert!(matches!(result, Err(SettingsError::Serialization(_))));
    }

    #[test]
    fn test_ban_policy_from_limit() {
        let mut settings = ChatSettings::new(1);
        assert_eq!(settings.ban_policy(), None);

        settings.vote_ban_limit = 2;
        assert_eq!(
            settings.ban_policy(),
            Some(DecisionPolicy::Quorum { min_approvals: 2 })
        );
    }
}

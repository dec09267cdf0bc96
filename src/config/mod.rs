//! Configuration
//!
//! `BotConfig` is read from a JSON5 file, then overridden from the
//! environment (a `.env` file is honoured).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::channels::TelegramConfig;
use crate::logging::LoggingConfig;
use crate::polls::DecisionPolicy;

/// Env var pointing at the config file
pub const CONFIG_PATH_ENV: &str = "VOTEKICK_CONFIG_PATH";
/// Env var overriding the settings file
pub const SETTINGS_PATH_ENV: &str = "VOTEKICK_SETTINGS_PATH";
/// Env var carrying the bot token
pub const BOT_TOKEN_ENV: &str = "BOT_TOKEN";

/// Longest vote a chat can be asked to sit through (one week)
pub const MAX_VOTE_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Bot token is not set (use BOT_TOKEN or telegram.botToken)")]
    MissingToken,

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Poll behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PollsConfig {
    /// How long a ban vote stays open
    pub vote_duration_secs: u64,
    /// Policy for chats without a configured approval limit
    pub default_policy: DecisionPolicy,
}

impl Default for PollsConfig {
    fn default() -> Self {
        Self {
            vote_duration_secs: 60,
            default_policy: DecisionPolicy::StrictMajority,
        }
    }
}

impl PollsConfig {
    pub fn vote_duration(&self) -> Duration {
        Duration::from_secs(self.vote_duration_secs)
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BotConfig {
    pub telegram: TelegramConfig,
    pub polls: PollsConfig,
    /// Chat settings file (defaults to the data dir)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings_path: Option<PathBuf>,
    pub logging: LoggingConfig,
}

impl BotConfig {
    /// Parse a JSON5 document
    pub fn from_json5(content: &str, path: &Path) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(BOT_TOKEN_ENV).filter(|t| !t.trim().is_empty()) {
            self.telegram.bot_token = token;
        }
        if let Some(path) = lookup(SETTINGS_PATH_ENV).filter(|p| !p.trim().is_empty()) {
            self.settings_path = Some(PathBuf::from(path));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }
        if self.polls.vote_duration_secs == 0 {
            return Err(ConfigError::Invalid(
                "polls.voteDurationSecs must be greater than 0".to_string(),
            ));
        }
        if self.polls.vote_duration_secs > MAX_VOTE_DURATION_SECS {
            return Err(ConfigError::Invalid(format!(
                "polls.voteDurationSecs must be at most {}",
                MAX_VOTE_DURATION_SECS
            )));
        }
        Ok(())
    }

    /// Resolved chat settings file
    pub fn settings_file(&self) -> PathBuf {
        self.settings_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("votekick")
                .join("settings.json")
        })
    }
}

/// Resolve the configuration file path
pub fn get_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("votekick")
        .join("votekick.json5")
}

/// Load configuration from `path` without environment overrides.
///
/// A missing file yields the defaults.
pub fn load_config_uncached(path: &Path) -> Result<BotConfig, ConfigError> {
    if !path.exists() {
        return Ok(BotConfig::default());
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    BotConfig::from_json5(&content, path)
}

/// Load configuration from the resolved path plus `.env` and the environment
pub fn load_config() -> Result<BotConfig, ConfigError> {
    // A missing .env is the normal case outside development.
    let _ = dotenvy::dotenv();

    let mut config = load_config_uncached(&get_config_path())?;
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogFormat;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = BotConfig::default();
        assert_eq!(config.polls.vote_duration(), Duration::from_secs(60));
        assert_eq!(config.polls.default_policy, DecisionPolicy::StrictMajority);
        assert!(config.telegram.bot_token.is_empty());
        assert!(matches!(config.validate(), Err(ConfigError::MissingToken)));
    }

    #[test]
    fn test_parse_json5() {
        let content = r#"{
            // comments are allowed
            telegram: { botToken: "123:abc", pollTimeoutSecs: 50 },
            polls: { voteDurationSecs: 120, defaultPolicy: { rule: "quorum", min_approvals: 3 } },
            logging: { level: "debug", format: "text" },
        }"#;

        let config = BotConfig::from_json5(content, Path::new("test.json5")).unwrap();
        assert_eq!(config.telegram.bot_token, "123:abc");
        assert_eq!(config.telegram.poll_timeout_secs, 50);
        assert_eq!(config.telegram.request_timeout_secs, 10);
        assert_eq!(config.polls.vote_duration_secs, 120);
        assert_eq!(
            config.polls.default_policy,
            DecisionPolicy::Quorum { min_approvals: 3 }
        );
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = BotConfig::from_json5("{ telegram: ", Path::new("broken.json5")).unwrap_err();
        assert!(err.to_string().contains("broken.json5"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (BOT_TOKEN_ENV, "from-env"),
            (SETTINGS_PATH_ENV, "/tmp/votekick-settings.json"),
        ]
        .into_iter()
        .collect();

        let mut config = BotConfig::default();
        config.telegram.bot_token = "from-file".to_string();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.telegram.bot_token, "from-env");
        assert_eq!(
            config.settings_file(),
            PathBuf::from("/tmp/votekick-settings.json")
        );
    }

    #[test]
    fn test_blank_env_token_is_ignored() {
        let mut config = BotConfig::default();
        config.telegram.bot_token = "from-file".to_string();
        config.apply_env(|key| (key == BOT_TOKEN_ENV).then(|| "  ".to_string()));
        assert_eq!(config.telegram.bot_token, "from-file");
    }

    #[test]
    fn test_zero_duration_is_invalid() {
        let mut config = BotConfig::default();
        config.telegram.bot_token = "t".to_string();
        config.polls.vote_duration_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_duration_upper_bound() {
        let mut config = BotConfig::default();
        config.telegram.bot_token = "t".to_string();

        config.polls.vote_duration_secs = MAX_VOTE_DURATION_SECS;
        assert!(config.validate().is_ok());

        config.polls.vote_duration_secs = u64::MAX;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config_uncached(&tmp.path().join("absent.json5")).unwrap();
        assert_eq!(config.polls.vote_duration_secs, 60);
    }

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("votekick.json5");
        std::fs::write(&path, r#"{ settingsPath: "/var/lib/votekick/settings.json" }"#).unwrap();

        let config = load_config_uncached(&path).unwrap();
        assert_eq!(
            config.settings_file(),
            PathBuf::from("/var/lib/votekick/settings.json")
        );
    }
}

//! CLI subcommand definitions and handlers.
//!
//! Uses clap derive to define the subcommand hierarchy:
//! - `run` (default) -- connect to Telegram and moderate chats
//! - `config show|path` -- inspect configuration
//! - `version` -- print build/version info

use clap::{Parser, Subcommand};

/// Vote-to-ban moderation bot for Telegram group chats.
#[derive(Parser, Debug)]
#[command(
    name = "votekick",
    version = env!("CARGO_PKG_VERSION"),
    about = "votekick: let a chat vote to ban its spammers"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the bot (default when no subcommand is given).
    Run,

    /// Inspect configuration.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Print version, build date, and git commit information.
    Version,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the fully loaded configuration (secrets redacted) as JSON.
    Show,

    /// Print the resolved configuration file path.
    Path,
}

// ---------------------------------------------------------------------------
// Subcommand handlers
// ---------------------------------------------------------------------------

use crate::config::{self, BotConfig};
use serde_json::Value;

/// Secrets that should be redacted when printing config.
const SECRET_KEYS: &[&str] = &["token", "secret", "password"];

/// Run the `config show` subcommand.
pub fn handle_config_show() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load_config()?;
    println!("{}", render_config(&cfg)?);
    Ok(())
}

/// Run the `config path` subcommand.
pub fn handle_config_path() {
    println!("{}", config::get_config_path().display());
}

/// Run the `version` subcommand.
pub fn handle_version() {
    println!("votekick {}", env!("CARGO_PKG_VERSION"));
    println!("  Build date: {}", env!("VOTEKICK_BUILD_DATE"));
    println!("  Git commit: {}", env!("VOTEKICK_GIT_HASH"));
    println!(
        "  Platform:   {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn render_config(cfg: &BotConfig) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(cfg)?;
    serde_json::to_string_pretty(&redact_secrets(value))
}

/// Redact known secret keys in a JSON value (recursive).
fn redact_secrets(mut value: Value) -> Value {
    match &mut value {
        Value::Object(map) => {
            let keys: Vec<String> = map.keys().cloned().collect();
            for key in keys {
                let lower = key.to_lowercase();
                if SECRET_KEYS.iter().any(|s| lower.contains(s)) {
                    map.insert(key, Value::String("[REDACTED]".to_string()));
                } else if let Some(child) = map.remove(&key) {
                    map.insert(key, redact_secrets(child));
                }
            }
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                *item = redact_secrets(item.take());
            }
        }
        _ => {}
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_is_none() {
        let cli = Cli::try_parse_from(["votekick"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_run() {
        let cli = Cli::try_parse_from(["votekick", "run"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Run)));
    }

    #[test]
    fn test_cli_config_subcommands() {
        let cli = Cli::try_parse_from(["votekick", "config", "show"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Config(ConfigCommand::Show))
        ));

        let cli = Cli::try_parse_from(["votekick", "config", "path"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Config(ConfigCommand::Path))
        ));
    }

    #[test]
    fn test_cli_version() {
        let cli = Cli::try_parse_from(["votekick", "version"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Version)));
    }

    #[test]
    fn test_cli_rejects_unknown() {
        assert!(Cli::try_parse_from(["votekick", "serve"]).is_err());
    }

    #[test]
    fn test_redact_secrets() {
        let val = serde_json::json!({
            "telegram": {
                "botToken": "123:abc",
                "pollTimeoutSecs": 30
            },
            "safe": "visible"
        });
        let redacted = redact_secrets(val);
        assert_eq!(redacted["telegram"]["botToken"], "[REDACTED]");
        assert_eq!(redacted["telegram"]["pollTimeoutSecs"], 30);
        assert_eq!(redacted["safe"], "visible");
    }

    #[test]
    fn test_redact_secrets_array() {
        let val = serde_json::json!([{"password": "hunter2"}, {"safe": "ok"}]);
        let redacted = redact_secrets(val);
        assert_eq!(redacted[0]["password"], "[REDACTED]");
        assert_eq!(redacted[1]["safe"], "ok");
    }

    #[test]
    fn test_render_config_hides_token() {
        let mut cfg = BotConfig::default();
        cfg.telegram.bot_token = "123:secret".to_string();

        let rendered = render_config(&cfg).unwrap();
        assert!(!rendered.contains("123:secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}

//! Command and callback parsing

use crate::polls::VoteOption;

/// Callback prefix for poll buttons
pub const POLL_PREFIX: &str = "poll";
/// Callback prefix for menu buttons
pub const MENU_PREFIX: &str = "menu";

/// Bot command sent as a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Activate the bot in a chat (admins only)
    Start,
    /// Propose banning the author of the replied-to message
    Ban,
    /// Show the settings menu (admins only)
    Menu,
}

impl Command {
    /// Parse a message text.
    ///
    /// Matching is case-insensitive. A `@botname` suffix is accepted when it
    /// names this bot (or when the bot's username is unknown); arguments after
    /// the command are ignored.
    pub fn parse(text: &str, bot_username: Option<&str>) -> Option<Self> {
        let first = text.split_whitespace().next()?.to_lowercase();
        let first = first.strip_prefix('/')?;

        let name = match first.split_once('@') {
            Some((name, target)) => {
                if let Some(username) = bot_username {
                    if !target.eq_ignore_ascii_case(username) {
                        return None;
                    }
                }
                name
            }
            None => first,
        };

        match name {
            "start" => Some(Command::Start),
            "ban" => Some(Command::Ban),
            "menu" => Some(Command::Menu),
            _ => None,
        }
    }
}

/// Entry of the settings menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    BanSettings,
    MuteSettings,
}

impl MenuAction {
    pub fn as_callback(&self) -> &'static str {
        match self {
            MenuAction::BanSettings => "BanSettings",
            MenuAction::MuteSettings => "MuteSettings",
        }
    }
}

/// Parsed inline-button payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Vote(VoteOption),
    Menu(MenuAction),
    /// A `menu:` payload this bot does not know
    UnknownMenu(String),
    Unknown,
}

impl CallbackAction {
    pub fn parse(data: &str) -> Self {
        let Some((prefix, value)) = data.split_once(':') else {
            return CallbackAction::Unknown;
        };

        match prefix {
            POLL_PREFIX => VoteOption::from_callback(value)
                .map(CallbackAction::Vote)
                .unwrap_or(CallbackAction::Unknown),
            MENU_PREFIX => match value {
                "BanSettings" => CallbackAction::Menu(MenuAction::BanSettings),
                "MuteSettings" => CallbackAction::Menu(MenuAction::MuteSettings),
                other => CallbackAction::UnknownMenu(other.to_string()),
            },
            _ => CallbackAction::Unknown,
        }
    }
}

/// Callback payload for a vote button
pub fn vote_callback(option: VoteOption) -> String {
    format!("{}:{}", POLL_PREFIX, option.as_callback())
}

/// Callback payload for a menu button
pub fn menu_callback(action: MenuAction) -> String {
    format!("{}:{}", MENU_PREFIX, action.as_callback())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/start", None), Some(Command::Start));
        assert_eq!(Command::parse("/BAN", None), Some(Command::Ban));
        assert_eq!(Command::parse("/menu please", None), Some(Command::Menu));
        assert_eq!(Command::parse("  /ban  ", None), Some(Command::Ban));
    }

    #[test]
    fn test_parse_rejects_non_commands() {
        assert_eq!(Command::parse("ban", None), None);
        assert_eq!(Command::parse("/unban", None), None);
        assert_eq!(Command::parse("", None), None);
        assert_eq!(Command::parse("hello /ban", None), None);
    }

    #[test]
    fn test_parse_bot_suffix() {
        assert_eq!(
            Command::parse("/ban@VoteKickBot", Some("votekickbot")),
            Some(Command::Ban)
        );
        assert_eq!(Command::parse("/ban@OtherBot", Some("votekickbot")), None);
        assert_eq!(Command::parse("/ban@AnyBot", None), Some(Command::Ban));
    }

    #[test]
    fn test_parse_callbacks() {
        assert_eq!(
            CallbackAction::parse("poll:Yes"),
            CallbackAction::Vote(VoteOption::Approve)
        );
        assert_eq!(
            CallbackAction::parse("poll:No"),
            CallbackAction::Vote(VoteOption::Reject)
        );
        assert_eq!(
            CallbackAction::parse("menu:MuteSettings"),
            CallbackAction::Menu(MenuAction::MuteSettings)
        );
        assert_eq!(
            CallbackAction::parse("menu:Other"),
            CallbackAction::UnknownMenu("Other".to_string())
        );
        assert_eq!(CallbackAction::parse("poll:Maybe"), CallbackAction::Unknown);
        assert_eq!(CallbackAction::parse("garbage"), CallbackAction::Unknown);
    }

    #[test]
    fn test_callback_payloads_round_trip() {
        let data = vote_callback(VoteOption::Reject);
        assert_eq!(data, "poll:No");
        assert_eq!(
            CallbackAction::parse(&menu_callback(MenuAction::BanSettings)),
            CallbackAction::Menu(MenuAction::BanSettings)
        );
    }
}

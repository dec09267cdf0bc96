//! Outbound message text and keyboards

use super::commands::{menu_callback, vote_callback, MenuAction};
use crate::channels::{InlineKeyboardButton, InlineKeyboardMarkup};
use crate::polls::{Outcome, Participant, Resolution, VoteCounts, VoteOption};
use crate::settings::ChatSettings;

pub const BOT_ACTIVATED: &str = "Bot activated!";
pub const SELF_BAN_REFUSED: &str = "Self-destruction is not the answer!";
pub const ADMIN_BAN_REFUSED: &str = "Administrators cannot be banned!";
pub const POLL_ALREADY_RUNNING: &str = "A vote is already running for this message.";
pub const POLL_CLOSED: &str = "This vote has ended or was not found";
pub const UNKNOWN_COMMAND: &str = "Unknown command";
pub const UNKNOWN_MENU_COMMAND: &str = "Unknown menu command";
pub const GENERIC_ERROR: &str = "Something went wrong";
pub const MENU_TEXT: &str = "Bot menu. Change the chat settings here.";

/// Keyboard under a poll announcement, showing live counts
pub fn poll_keyboard(counts: VoteCounts) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::single_column(vec![
        InlineKeyboardButton::callback(
            format!("👿 Ban [{}]", counts.approve),
            vote_callback(VoteOption::Approve),
        ),
        InlineKeyboardButton::callback(
            format!("😇 Spare [{}]", counts.reject),
            vote_callback(VoteOption::Reject),
        ),
    ])
}

pub fn poll_announcement(initiator: &Participant, subject: &Participant) -> String {
    format!(
        "{} started a vote to ban {}",
        initiator.name, subject.name
    )
}

/// Final text of a resolved poll's announcement
pub fn resolution_text(resolution: &Resolution, action_failed: bool) -> String {
    let verdict = match resolution.outcome {
        Outcome::Action if action_failed => {
            format!("The vote passed, but {} could not be banned.", resolution.subject.name)
        }
        Outcome::Action => format!("{} has been banned.", resolution.subject.name),
        Outcome::NoAction => "The vote failed.".to_string(),
    };

    format!(
        "Vote {} VS {} finished.\nFor: {}, Against: {}\n{}",
        resolution.initiator.name,
        resolution.subject.name,
        resolution.counts.approve,
        resolution.counts.reject,
        verdict
    )
}

pub fn menu_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::single_column(vec![
        InlineKeyboardButton::callback(
            "🚫 Ban settings",
            menu_callback(MenuAction::BanSettings),
        ),
        InlineKeyboardButton::callback(
            "🤐 Mute settings",
            menu_callback(MenuAction::MuteSettings),
        ),
    ])
}

/// Toast shown for a menu button
pub fn menu_answer(action: MenuAction, settings: &ChatSettings) -> String {
    match action {
        MenuAction::BanSettings => format!(
            "Ban settings: approvals required {}, delete command {}",
            describe_limit(settings.vote_ban_limit),
            if settings.delete_message { "on" } else { "off" }
        ),
        MenuAction::MuteSettings => format!(
            "Mute settings: {} min, approvals required {}",
            settings.mute_minutes,
            describe_limit(settings.vote_mute_limit)
        ),
    }
}

fn describe_limit(limit: u32) -> String {
    if limit == 0 {
        "majority".to_string()
    } else {
        limit.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polls::PollKey;

    fn resolution(counts: VoteCounts, outcome: Outcome) -> Resolution {
        Resolution {
            key: PollKey::new(1, 2),
            subject: Participant::new(10, "Mallory"),
            initiator: Participant::new(20, "Alice"),
            counts,
            outcome,
        }
    }

    #[test]
    fn test_poll_keyboard_counts() {
        let markup = poll_keyboard(VoteCounts::new(3, 1));
        assert_eq!(markup.inline_keyboard.len(), 2);
        assert_eq!(markup.inline_keyboard[0][0].text, "👿 Ban [3]");
        assert_eq!(markup.inline_keyboard[0][0].callback_data, "poll:Yes");
        assert_eq!(markup.inline_keyboard[1][0].text, "😇 Spare [1]");
        assert_eq!(markup.inline_keyboard[1][0].callback_data, "poll:No");
    }

    #[test]
    fn test_announcement() {
        let text = poll_announcement(
            &Participant::new(1, "Alice"),
            &Participant::new(2, "Mallory"),
        );
        assert_eq!(text, "Alice started a vote to ban Mallory");
    }

    #[test]
    fn test_resolution_text() {
        let text = resolution_text(&resolution(VoteCounts::new(3, 0), Outcome::Action), false);
        assert_eq!(
            text,
            "Vote Alice VS Mallory finished.\nFor: 3, Against: 0\nMallory has been banned."
        );

        let text = resolution_text(&resolution(VoteCounts::new(1, 1), Outcome::NoAction), false);
        assert!(text.ends_with("The vote failed."));

        let text = resolution_text(&resolution(VoteCounts::new(2, 0), Outcome::Action), true);
        assert!(text.contains("could not be banned"));
    }

    #[test]
    fn test_menu_answer() {
        let mut settings = ChatSettings::new(1);
        assert_eq!(
            menu_answer(MenuAction::BanSettings, &settings),
            "Ban settings: approvals required majority, delete command off"
        );

        settings.mute_minutes = 15;
        settings.vote_mute_limit = 4;
        assert_eq!(
            menu_answer(MenuAction::MuteSettings, &settings),
            "Mute settings: 15 min, approvals required 4"
        );
    }
}

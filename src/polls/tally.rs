//! Vote Tally
//!
//! Per-poll voter → option mapping with counts derived on demand.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::UserId;

/// A choice on a moderation poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteOption {
    /// In favour of the moderation action
    Approve,
    /// Against the moderation action
    Reject,
}

impl VoteOption {
    /// Callback payload used on the inline keyboard
    pub fn as_callback(&self) -> &'static str {
        match self {
            VoteOption::Approve => "Yes",
            VoteOption::Reject => "No",
        }
    }

    /// Parse the callback payload back into an option
    pub fn from_callback(value: &str) -> Option<Self> {
        match value {
            "Yes" => Some(VoteOption::Approve),
            "No" => Some(VoteOption::Reject),
            _ => None,
        }
    }
}

/// Approve/reject counts at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCounts {
    pub approve: u32,
    pub reject: u32,
}

impl VoteCounts {
    pub fn new(approve: u32, reject: u32) -> Self {
        Self { approve, reject }
    }

    /// Number of voters with a live vote
    pub fn total(&self) -> u32 {
        self.approve + self.reject
    }
}

#[derive(Debug, Default)]
struct TallyState {
    votes: HashMap<UserId, VoteOption>,
    sealed: bool,
}

impl TallyState {
    fn counts(&self) -> VoteCounts {
        self.votes
            .values()
            .fold(VoteCounts::default(), |mut counts, option| {
                match option {
                    VoteOption::Approve => counts.approve += 1,
                    VoteOption::Reject => counts.reject += 1,
                }
                counts
            })
    }
}

/// Concurrency-safe vote tally
///
/// Every operation runs under a single lock, so callers always observe counts
/// that match some serialization of the votes applied so far.
#[derive(Debug, Default)]
pub struct VoteTally {
    state: Mutex<TallyState>,
}

impl VoteTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `option` for `voter` with toggle semantics.
    ///
    /// Choosing the option already on record retracts the vote; any other
    /// choice overwrites it. Returns the counts after the change, or `None`
    /// if the tally was sealed by resolution.
    pub fn set_vote(&self, voter: UserId, option: VoteOption) -> Option<VoteCounts> {
        let mut state = self.state.lock();
        if state.sealed {
            return None;
        }

        if state.votes.get(&voter) == Some(&option) {
            state.votes.remove(&voter);
        } else {
            state.votes.insert(voter, option);
        }

        Some(state.counts())
    }

    /// Current counts
    pub fn snapshot(&self) -> VoteCounts {
        self.state.lock().counts()
    }

    /// Close the tally and return the final counts.
    ///
    /// After this returns, `set_vote` refuses every call.
    pub fn seal(&self) -> VoteCounts {
        let mut state = self.state.lock();
        state.sealed = true;
        state.counts()
    }
}

//! Poll Registry
//!
//! Owns every open poll, keyed by the announcement it belongs to.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;

use super::{ChatId, DecisionPolicy, MessageId, UserId, VoteTally};

/// Identifies one poll: the chat and the announcement message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PollKey {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

impl PollKey {
    pub fn new(chat_id: ChatId, message_id: MessageId) -> Self {
        Self {
            chat_id,
            message_id,
        }
    }
}

impl fmt::Display for PollKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.chat_id, self.message_id)
    }
}

/// A user taking part in a poll, as subject or initiator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: UserId,
    pub name: String,
}

impl Participant {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// An open poll
#[derive(Debug)]
pub struct Poll {
    key: PollKey,
    subject: Participant,
    initiator: Participant,
    tally: VoteTally,
    policy: DecisionPolicy,
    opened_at: DateTime<Utc>,
    deadline: Instant,
}

impl Poll {
    pub fn new(
        key: PollKey,
        subject: Participant,
        initiator: Participant,
        policy: DecisionPolicy,
        deadline: Instant,
    ) -> Self {
        Self {
            key,
            subject,
            initiator,
            tally: VoteTally::new(),
            policy,
            opened_at: Utc::now(),
            deadline,
        }
    }

    pub fn key(&self) -> PollKey {
        self.key
    }

    pub fn subject(&self) -> &Participant {
        &self.subject
    }

    pub fn initiator(&self) -> &Participant {
        &self.initiator
    }

    pub fn tally(&self) -> &VoteTally {
        &self.tally
    }

    pub fn policy(&self) -> DecisionPolicy {
        self.policy
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

/// Concurrency-safe map of open polls
///
/// The lock only guards map operations; tallies carry their own lock so
/// voting on one poll never waits on another.
#[derive(Debug, Default)]
pub struct PollRegistry {
    polls: RwLock<HashMap<PollKey, Arc<Poll>>>,
}

impl PollRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `poll` under `key` unless a poll is already registered there.
    pub fn insert(&self, key: PollKey, poll: Arc<Poll>) -> bool {
        use std::collections::hash_map::Entry;

        match self.polls.write().entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(poll);
                true
            }
        }
    }

    /// Look up an open poll. Do not hold the result across await points.
    pub fn get(&self, key: &PollKey) -> Option<Arc<Poll>> {
        self.polls.read().get(key).cloned()
    }

    /// Detach the poll under `key`, if still registered.
    pub fn remove_if_present(&self, key: &PollKey) -> Option<Arc<Poll>> {
        self.polls.write().remove(key)
    }

    pub fn contains(&self, key: &PollKey) -> bool {
        self.polls.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.polls.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.polls.read().is_empty()
    }

    pub fn keys(&self) -> Vec<PollKey> {
        self.polls.read().keys().copied().collect()
    }
}

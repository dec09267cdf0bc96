//! Moderation Polls
//!
//! Timed approve/reject votes that resolve exactly once at their deadline.
//! Votes toggle, tallies are safe under concurrent casting, and the final
//! tally is handed to a [`ResolutionSink`].

pub mod engine;
pub mod policy;
pub mod registry;
pub mod tally;

pub use engine::{
    create_engine, PollEngine, PollEngineStats, PollError, PollHandle, PollRequest, Resolution,
    ResolutionFailure, ResolutionSink, SinkError,
};
pub use policy::{DecisionPolicy, Outcome};
pub use registry::{Participant, Poll, PollKey, PollRegistry};
pub use tally::{VoteCounts, VoteOption, VoteTally};

/// Chat (conversation) identifier
pub type ChatId = i64;
/// Message identifier, unique within a chat
pub type MessageId = i64;
/// User identifier
pub type UserId = i64;

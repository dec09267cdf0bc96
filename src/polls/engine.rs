//! Poll Engine
//!
//! Handles poll opening, vote casting, and the timed one-shot resolution.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, error, info};

use super::{
    DecisionPolicy, Outcome, Participant, Poll, PollKey, PollRegistry, UserId, VoteCounts,
    VoteOption,
};

/// Capacity of the sink failure broadcast channel
const FAILURE_CHANNEL_CAPACITY: usize = 64;

/// Errors returned by poll lifecycle operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    #[error("A poll is already running for {0}")]
    DuplicatePoll(PollKey),

    #[error("Poll {0} has ended or was not found")]
    PollNotFound(PollKey),

    #[error("Poll duration {duration:?} for {key} is out of range")]
    InvalidDuration { key: PollKey, duration: Duration },
}

/// Errors raised by a resolution sink
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Chat API error: {0}")]
    Chat(#[from] crate::channels::ChatError),

    #[error("Moderation action failed: {0}")]
    ActionFailed(String),
}

/// Final state of a poll handed to the sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub key: PollKey,
    pub subject: Participant,
    pub initiator: Participant,
    pub counts: VoteCounts,
    pub outcome: Outcome,
}

/// Performs the real-world effect of a resolved poll
#[async_trait]
pub trait ResolutionSink: Send + Sync {
    /// Invoked exactly once per poll, after it left the registry
    async fn resolve(&self, resolution: &Resolution) -> Result<(), SinkError>;
}

/// A sink failure, as published on the failure channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionFailure {
    pub key: PollKey,
    pub subject_id: UserId,
    pub outcome: Outcome,
    pub error: String,
}

/// Parameters for opening a poll
#[derive(Debug, Clone)]
pub struct PollRequest {
    pub key: PollKey,
    pub subject: Participant,
    pub initiator: Participant,
    pub duration: Duration,
    pub policy: Option<DecisionPolicy>,
}

impl PollRequest {
    pub fn new(
        key: PollKey,
        subject: Participant,
        initiator: Participant,
        duration: Duration,
    ) -> Self {
        Self {
            key,
            subject,
            initiator,
            duration,
            policy: None,
        }
    }

    /// Override the engine's default decision policy for this poll
    pub fn with_policy(mut self, policy: DecisionPolicy) -> Self {
        self.policy = Some(policy);
        self
    }
}

/// Returned by a successful open, for rendering the initial poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollHandle {
    pub key: PollKey,
    pub counts: VoteCounts,
    pub closes_at: DateTime<Utc>,
}

/// Poll engine statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct PollEngineStats {
    pub active_polls: usize,
    pub opened: u64,
    pub resolved: u64,
    pub actions_taken: u64,
    pub sink_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    opened: AtomicU64,
    resolved: AtomicU64,
    actions_taken: AtomicU64,
    sink_failures: AtomicU64,
}

/// Poll engine for moderation votes
pub struct PollEngine {
    registry: Arc<PollRegistry>,
    sink: Arc<dyn ResolutionSink>,
    default_policy: DecisionPolicy,
    failures: broadcast::Sender<ResolutionFailure>,
    counters: Counters,
}

impl PollEngine {
    /// Create a new poll engine over an existing registry
    pub fn new(registry: Arc<PollRegistry>, sink: Arc<dyn ResolutionSink>) -> Self {
        let (failures, _) = broadcast::channel(FAILURE_CHANNEL_CAPACITY);
        Self {
            registry,
            sink,
            default_policy: DecisionPolicy::default(),
            failures,
            counters: Counters::default(),
        }
    }

    /// Set the policy used by polls that do not override it
    pub fn with_default_policy(mut self, policy: DecisionPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    pub fn registry(&self) -> &Arc<PollRegistry> {
        &self.registry
    }

    /// Open a poll and schedule its resolution at the deadline.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open_poll(self: &Arc<Self>, request: PollRequest) -> Result<PollHandle, PollError> {
        let PollRequest {
            key,
            subject,
            initiator,
            duration,
            policy,
        } = request;

        let out_of_range = || PollError::InvalidDuration { key, duration };
        let deadline = Instant::now()
            .checked_add(duration)
            .ok_or_else(out_of_range)?;
        let span = chrono::Duration::from_std(duration).map_err(|_| out_of_range())?;

        let policy = policy.unwrap_or(self.default_policy);
        let poll = Arc::new(Poll::new(key, subject, initiator, policy, deadline));
        let closes_at = poll
            .opened_at()
            .checked_add_signed(span)
            .ok_or_else(out_of_range)?;

        if !self.registry.insert(key, Arc::clone(&poll)) {
            debug!(poll = %key, "poll already running, refusing to open another");
            return Err(PollError::DuplicatePoll(key));
        }
        self.counters.opened.fetch_add(1, Ordering::Relaxed);

        info!(
            poll = %key,
            subject = poll.subject().id,
            initiator = poll.initiator().id,
            duration_secs = duration.as_secs(),
            ?policy,
            "poll opened"
        );

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            engine.resolve_at(key).await;
        });

        Ok(PollHandle {
            key,
            counts: VoteCounts::default(),
            closes_at,
        })
    }

    /// Cast or toggle a vote and return the live counts.
    pub fn cast_vote(
        &self,
        key: PollKey,
        voter: UserId,
        option: VoteOption,
    ) -> Result<VoteCounts, PollError> {
        let poll = self
            .registry
            .get(&key)
            .ok_or(PollError::PollNotFound(key))?;

        // A sealed tally means resolution detached the poll after our lookup.
        let counts = poll
            .tally()
            .set_vote(voter, option)
            .ok_or(PollError::PollNotFound(key))?;

        debug!(
            poll = %key,
            voter,
            ?option,
            approve = counts.approve,
            reject = counts.reject,
            "vote recorded"
        );
        Ok(counts)
    }

    /// Live counts of an open poll
    pub fn current_counts(&self, key: PollKey) -> Result<VoteCounts, PollError> {
        self.registry
            .get(&key)
            .map(|poll| poll.tally().snapshot())
            .ok_or(PollError::PollNotFound(key))
    }

    pub fn is_open(&self, key: PollKey) -> bool {
        self.registry.contains(&key)
    }

    /// Resolve the poll under `key`, once.
    ///
    /// Called by the deadline task. Returns `None` if the poll was already
    /// detached.
    pub async fn resolve_at(&self, key: PollKey) -> Option<Resolution> {
        let Some(poll) = self.registry.remove_if_present(&key) else {
            debug!(poll = %key, "poll already resolved");
            return None;
        };

        let counts = poll.tally().seal();
        let outcome = poll.policy().decide(counts);
        let resolution = Resolution {
            key,
            subject: poll.subject().clone(),
            initiator: poll.initiator().clone(),
            counts,
            outcome,
        };
        drop(poll);

        self.counters.resolved.fetch_add(1, Ordering::Relaxed);
        if outcome.is_action() {
            self.counters.actions_taken.fetch_add(1, Ordering::Relaxed);
        }

        info!(
            poll = %key,
            approve = counts.approve,
            reject = counts.reject,
            voters = counts.total(),
            ?outcome,
            "poll resolved"
        );

        if let Err(e) = self.sink.resolve(&resolution).await {
            self.counters.sink_failures.fetch_add(1, Ordering::Relaxed);
            error!(poll = %key, error = %e, "resolution sink failed");
            // Nobody listening is fine; the failure is already logged.
            let _ = self.failures.send(ResolutionFailure {
                key,
                subject_id: resolution.subject.id,
                outcome,
                error: e.to_string(),
            });
        }

        Some(resolution)
    }

    /// Receive sink failures from now on
    pub fn subscribe_failures(&self) -> broadcast::Receiver<ResolutionFailure> {
        self.failures.subscribe()
    }

    pub fn stats(&self) -> PollEngineStats {
        PollEngineStats {
            active_polls: self.registry.len(),
            opened: self.counters.opened.load(Ordering::Relaxed),
            resolved: self.counters.resolved.load(Ordering::Relaxed),
            actions_taken: self.counters.actions_taken.load(Ordering::Relaxed),
            sink_failures: self.counters.sink_failures.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for PollEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollEngine")
            .field("registry", &self.registry)
            .field("default_policy", &self.default_policy)
            .finish_non_exhaustive()
    }
}

/// Create a shared engine with a fresh registry
pub fn create_engine(sink: Arc<dyn ResolutionSink>) -> Arc<PollEngine> {
    Arc::new(PollEngine::new(Arc::new(PollRegistry::new()), sink))
}

//! Decision Policy
//!
//! Turns a final tally into an outcome.

use serde::{Deserialize, Serialize};

use super::VoteCounts;

/// Result of a resolved poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Carry out the moderation action
    Action,
    /// Leave the subject alone
    NoAction,
}

impl Outcome {
    pub fn is_action(&self) -> bool {
        matches!(self, Outcome::Action)
    }
}

/// Rule applied to the final counts of a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum DecisionPolicy {
    /// Approvals must strictly outnumber rejections; ties favour no action
    #[default]
    StrictMajority,
    /// Strict majority plus a minimum number of approvals
    Quorum { min_approvals: u32 },
}

impl DecisionPolicy {
    pub fn decide(&self, counts: VoteCounts) -> Outcome {
        let majority = counts.approve > counts.reject;
        let passed = match self {
            DecisionPolicy::StrictMajority => majority,
            DecisionPolicy::Quorum { min_approvals } => {
                majority && counts.approve >= *min_approvals
            }
        };

        if passed {
            Outcome::Action
        } else {
            Outcome::NoAction
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_majority() {
        let policy = DecisionPolicy::StrictMajority;
        assert_eq!(policy.decide(VoteCounts::new(3, 0)), Outcome::Action);
        assert_eq!(policy.decide(VoteCounts::new(2, 1)), Outcome::Action);
        assert_eq!(policy.decide(VoteCounts::new(0, 1)), Outcome::NoAction);
        assert_eq!(policy.decide(VoteCounts::default()), Outcome::NoAction);
    }

    #[test]
    fn test_tie_favours_no_action() {
        let policy = DecisionPolicy::StrictMajority;
        assert_eq!(policy.decide(VoteCounts::new(4, 4)), Outcome::NoAction);
    }

    #[test]
    fn test_quorum_requires_min_approvals() {
        let policy = DecisionPolicy::Quorum { min_approvals: 3 };
        assert_eq!(policy.decide(VoteCounts::new(2, 0)), Outcome::NoAction);
        assert_eq!(policy.decide(VoteCounts::new(3, 0)), Outcome::Action);
        assert_eq!(policy.decide(VoteCounts::new(3, 3)), Outcome::NoAction);
    }

    #[test]
    fn test_policy_serialization() {
        let json = serde_json::to_string(&DecisionPolicy::Quorum { min_approvals: 2 }).unwrap();
        assert!(json.contains("\"rule\":\"quorum\""));

        let parsed: DecisionPolicy = serde_json::from_str(r#"{"rule":"strict_majority"}"#).unwrap();
        assert_eq!(parsed, DecisionPolicy::StrictMajority);
    }
}

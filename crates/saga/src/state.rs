//! Saga state machine.

use serde::{Deserialize, Serialize};

/// The state of one saga run.
///
/// State transitions:
/// ```text
/// Start ──► LimitChecked ──► Persisted ──► Confirmed ──► Done
///   │           │                │
///   │           │                └──► Compensating ──► Done
///   └───────────┴──► Done (rejected or aborted)
/// ```
///
/// In concurrent mode `Persisted` and `Confirmed` are both reached only
/// after the two branches have joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SagaState {
    #[default]
    Start,

    /// The available limit covers the principal.
    LimitChecked,

    /// The transaction is durable in the store.
    Persisted,

    /// The remote limit has been decremented.
    Confirmed,

    /// Confirmation failed; the persisted transaction is being deleted.
    Compensating,

    /// Terminal.
    Done,
}

impl SagaState {
    /// Returns true if `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: SagaState) -> bool {
        use SagaState::*;
        matches!(
            (self, next),
            (Start, LimitChecked)
                | (Start, Done)
                | (LimitChecked, Persisted)
                | (LimitChecked, Done)
                | (Persisted, Confirmed)
                | (Persisted, Compensating)
                | (Confirmed, Done)
                | (Compensating, Done)
        )
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaState::Start => "Start",
            SagaState::LimitChecked => "LimitChecked",
            SagaState::Persisted => "Persisted",
            SagaState::Confirmed => "Confirmed",
            SagaState::Compensating => "Compensating",
            SagaState::Done => "Done",
        }
    }
}

impl std::fmt::Display for SagaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

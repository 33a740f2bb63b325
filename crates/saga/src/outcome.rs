//! Terminal outcome of one saga run.

use serde::{Deserialize, Serialize};

/// How a single transaction-creation saga ended. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SagaOutcome {
    /// Limit checked, transaction persisted, reservation confirmed.
    Succeeded,

    /// The available limit was below the requested principal. Nothing was
    /// written and nothing was decremented.
    RejectedInsufficientLimit,

    /// Failed before any side effect needed undoing (invalid request,
    /// limit-service or store failure before persist, cancellation).
    Aborted,

    /// Confirmation failed and the persisted transaction was deleted.
    FailedCompensated,

    /// Confirmation failed and the compensating delete failed too, or a
    /// decrement went through without its transaction. Local and remote
    /// state disagree.
    FailedCompensationFailed,
}

impl SagaOutcome {
    /// Returns true if running the whole saga again is safe.
    ///
    /// `FailedCompensated` also covers a confirm that was cancelled or lost
    /// in transport. The remote side may still have applied that decrement,
    /// so a retry can decrement the limit twice. Callers retrying such runs
    /// should reconcile the remote limit first.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SagaOutcome::Aborted | SagaOutcome::FailedCompensated
        )
    }

    /// Returns true if the outcome needs operator intervention.
    pub fn is_inconsistent(&self) -> bool {
        matches!(self, SagaOutcome::FailedCompensationFailed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SagaOutcome::Succeeded => "succeeded",
            SagaOutcome::RejectedInsufficientLimit => "rejected_insufficient_limit",
            SagaOutcome::Aborted => "aborted",
            SagaOutcome::FailedCompensated => "failed_compensated",
            SagaOutcome::FailedCompensationFailed => "failed_compensation_failed",
        }
    }
}

impl std::fmt::Display for SagaOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_compensation_failure_is_inconsistent() {
        assert!(SagaOutcome::FailedCompensationFailed.is_inconsistent());
        assert!(!SagaOutcome::FailedCompensated.is_inconsistent());
        assert!(!SagaOutcome::Succeeded.is_inconsistent());
    }

    #[test]
    fn retryable_outcomes() {
        assert!(SagaOutcome::Aborted.is_retryable());
        assert!(SagaOutcome::FailedCompensated.is_retryable());
        assert!(!SagaOutcome::FailedCompensationFailed.is_retryable());
        assert!(!SagaOutcome::RejectedInsufficientLimit.is_retryable());
        assert!(!SagaOutcome::Succeeded.is_retryable());
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&SagaOutcome::RejectedInsufficientLimit).unwrap();
        assert_eq!(json, "\"rejected_insufficient_limit\"");
        assert_eq!(
            SagaOutcome::FailedCompensated.to_string(),
            "failed_compensated"
        );
    }
}

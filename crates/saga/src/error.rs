//! Saga error types.

use common::{Amount, ConsumerId, Tenor, TransactionId};
use domain::DomainError;
use thiserror::Error;

use crate::outcome::SagaOutcome;
use crate::services::LimitServiceError;

/// Errors that end a transaction-creation saga.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The request failed local validation before any remote call.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The available limit does not cover the requested principal.
    #[error("Limit available not enough: available {available}, requested {requested}")]
    InsufficientLimit {
        consumer_id: ConsumerId,
        tenor: Tenor,
        available: Amount,
        requested: Amount,
    },

    /// The limit service knows no limit for this consumer and tenor.
    #[error("Consumer limit not found for consumer {consumer_id}, tenor {tenor}")]
    LimitNotFound { consumer_id: ConsumerId, tenor: Tenor },

    /// The limit check could not be completed.
    #[error("Limit service unavailable: {0}")]
    UpstreamUnavailable(#[source] LimitServiceError),

    /// The store already holds this contract number.
    #[error("Transaction already exists for contract number: {0}")]
    DuplicateContractNumber(String),

    /// Persisting the transaction failed.
    #[error("Store fault: {0}")]
    StoreFault(#[source] DomainError),

    /// The run was cancelled before anything was persisted.
    #[error("Saga cancelled")]
    Cancelled,

    /// Confirmation failed; the persisted transaction was deleted.
    #[error("Limit confirmation failed for transaction {transaction_id}, rolled back: {source}")]
    ConfirmationFailed {
        transaction_id: TransactionId,
        contract_number: String,
        #[source]
        source: LimitServiceError,
    },

    /// Confirmation failed and so did the compensating delete. The
    /// transaction row remains while the remote limit was not decremented.
    #[error(
        "Compensation failed for transaction {transaction_id} after confirmation error ({confirm_error}): {source}"
    )]
    CompensationFault {
        transaction_id: TransactionId,
        contract_number: String,
        confirm_error: LimitServiceError,
        #[source]
        source: DomainError,
    },

    /// The remote limit was decremented but the transaction could not be
    /// persisted. Only reachable in concurrent mode; there is no remote
    /// operation to undo a decrement.
    #[error(
        "Limit decremented by {amount} for consumer {consumer_id}, tenor {tenor} without a transaction: {source}"
    )]
    UnreconciledDecrement {
        consumer_id: ConsumerId,
        tenor: Tenor,
        amount: Amount,
        #[source]
        source: Box<SagaError>,
    },
}

impl SagaError {
    /// Maps the error to the saga outcome it represents.
    pub fn outcome(&self) -> SagaOutcome {
        match self {
            SagaError::InsufficientLimit { .. } => SagaOutcome::RejectedInsufficientLimit,
            SagaError::ConfirmationFailed { .. } => SagaOutcome::FailedCompensated,
            SagaError::CompensationFault { .. } | SagaError::UnreconciledDecrement { .. } => {
                SagaOutcome::FailedCompensationFailed
            }
            SagaError::InvalidRequest(_)
            | SagaError::LimitNotFound { .. }
            | SagaError::UpstreamUnavailable(_)
            | SagaError::DuplicateContractNumber(_)
            | SagaError::StoreFault(_)
            | SagaError::Cancelled => SagaOutcome::Aborted,
        }
    }

    /// Classifies a failed persist.
    pub(crate) fn from_persist(err: DomainError) -> Self {
        match err {
            DomainError::DuplicateContractNumber(number) => {
                SagaError::DuplicateContractNumber(number)
            }
            DomainError::InvalidRequest(message) => SagaError::InvalidRequest(message),
            other => SagaError::StoreFault(other),
        }
    }

    /// Classifies a failed limit check.
    pub(crate) fn from_limit_check(err: LimitServiceError) -> Self {
        match err {
            LimitServiceError::ConsumerLimitNotFound { consumer_id, tenor } => {
                SagaError::LimitNotFound { consumer_id, tenor }
            }
            LimitServiceError::Cancelled => SagaError::Cancelled,
            other => SagaError::UpstreamUnavailable(other),
        }
    }
}

impl From<DomainError> for SagaError {
    fn from(err: DomainError) -> Self {
        Self::from_persist(err)
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;

#[cfg(test)]
mod tests {
    use transaction_store::StoreError;

    use super::*;

    #[test]
    fn outcome_mapping() {
        let insufficient = SagaError::InsufficientLimit {
            consumer_id: ConsumerId::new(2),
            tenor: Tenor::new(6),
            available: Amount::new(10_000),
            requested: Amount::new(50_000),
        };
        assert_eq!(
            insufficient.outcome(),
            SagaOutcome::RejectedInsufficientLimit
        );

        let compensated = SagaError::ConfirmationFailed {
            transaction_id: TransactionId::new(1),
            contract_number: "CNTR-1".into(),
            source: LimitServiceError::Unavailable("down".into()),
        };
        assert_eq!(compensated.outcome(), SagaOutcome::FailedCompensated);

        let fault = SagaError::CompensationFault {
            transaction_id: TransactionId::new(1),
            contract_number: "CNTR-1".into(),
            confirm_error: LimitServiceError::Unavailable("down".into()),
            source: DomainError::Store(StoreError::Unavailable("delete".into())),
        };
        assert_eq!(fault.outcome(), SagaOutcome::FailedCompensationFailed);

        assert_eq!(SagaError::Cancelled.outcome(), SagaOutcome::Aborted);
    }

    #[test]
    fn limit_check_errors_are_classified() {
        assert!(matches!(
            SagaError::from_limit_check(LimitServiceError::Cancelled),
            SagaError::Cancelled
        ));
        assert!(matches!(
            SagaError::from_limit_check(LimitServiceError::ConsumerLimitNotFound {
                consumer_id: ConsumerId::new(1),
                tenor: Tenor::new(6),
            }),
            SagaError::LimitNotFound { .. }
        ));
        assert!(matches!(
            SagaError::from_limit_check(LimitServiceError::Unavailable("x".into())),
            SagaError::UpstreamUnavailable(_)
        ));
    }

    #[test]
    fn persist_errors_are_classified() {
        let dup: SagaError = DomainError::DuplicateContractNumber("CNTR-1".into()).into();
        assert!(matches!(dup, SagaError::DuplicateContractNumber(_)));

        let fault: SagaError =
            DomainError::Store(StoreError::Unavailable("insert".into())).into();
        assert!(matches!(fault, SagaError::StoreFault(_)));
    }

    #[test]
    fn insufficient_limit_message_matches_service_wording() {
        let err = SagaError::InsufficientLimit {
            consumer_id: ConsumerId::new(2),
            tenor: Tenor::new(6),
            available: Amount::new(10_000),
            requested: Amount::new(50_000),
        };
        assert!(err.to_string().starts_with("Limit available not enough"));
    }
}

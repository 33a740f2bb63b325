//! Domain error types.

use thiserror::Error;
use transaction_store::StoreError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The request violates a precondition (tenor, principal, asset name).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A contract number does not follow the expected layout.
    #[error("Malformed contract number: {0}")]
    MalformedContractNumber(String),

    /// The store already holds a transaction with this contract number.
    #[error("Transaction already exists for contract number: {0}")]
    DuplicateContractNumber(String),

    /// No transaction matched the lookup.
    #[error("Transaction not found")]
    NotFound,

    /// An error occurred in the transaction store.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateContractNumber(number) => {
                DomainError::DuplicateContractNumber(number)
            }
            StoreError::NotFound(_) => DomainError::NotFound,
            other => DomainError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use transaction_store::TransactionId;

    use super::*;

    #[test]
    fn duplicate_store_error_maps_to_domain_duplicate() {
        let err: DomainError = StoreError::DuplicateContractNumber("CNTR-1".into()).into();
        assert!(matches!(err, DomainError::DuplicateContractNumber(ref n) if n == "CNTR-1"));
    }

    #[test]
    fn missing_row_maps_to_not_found() {
        let err: DomainError = StoreError::NotFound(TransactionId::new(4)).into();
        assert!(matches!(err, DomainError::NotFound));
    }

    #[test]
    fn other_store_errors_are_wrapped() {
        let err: DomainError = StoreError::Unavailable("down".into()).into();
        assert!(matches!(err, DomainError::Store(_)));
        assert_eq!(err.to_string(), "Store error: Store unavailable: down");
    }
}

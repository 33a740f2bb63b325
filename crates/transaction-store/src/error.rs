use thiserror::Error;

use crate::TransactionId;

/// Errors that can occur when interacting with the transaction store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another transaction already holds this contract number.
    #[error("Transaction already exists for contract number: {0}")]
    DuplicateContractNumber(String),

    /// The record handed to `insert` already carries a store identifier.
    #[error("Transaction {0} is already persisted")]
    AlreadyPersisted(TransactionId),

    /// No transaction exists with the given identifier.
    #[error("Transaction not found for id: {0}")]
    NotFound(TransactionId),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A numeric column value does not fit the database representation.
    #[error("Value out of range for column {column}")]
    ValueOutOfRange { column: &'static str },

    /// The store is unavailable for a reason other than a database error.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for transaction store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

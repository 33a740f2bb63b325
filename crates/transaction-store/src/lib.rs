//! Transaction store: durable records of installment purchases.
//!
//! Records are keyed by a store-assigned [`TransactionId`] and by a unique,
//! human-readable contract number. The store is the final authority on
//! contract-number uniqueness.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;
pub mod transaction;

pub use common::{Amount, ConsumerId, Tenor, TransactionId};
pub use error::{Result, StoreError};
pub use memory::InMemoryTransactionStore;
pub use postgres::PostgresTransactionStore;
pub use query::TransactionQuery;
pub use store::{TransactionStore, TransactionStoreExt};
pub use transaction::{Transaction, TransactionBuilder};

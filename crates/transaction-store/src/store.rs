use async_trait::async_trait;

use crate::{ConsumerId, Result, Transaction, TransactionId, TransactionQuery};

/// Core trait for transaction store implementations.
///
/// All implementations must be thread-safe (Send + Sync) and must enforce
/// contract-number uniqueness themselves.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Inserts a new transaction and returns it with its assigned identifier.
    ///
    /// Fails with `DuplicateContractNumber` if another transaction already
    /// holds the same contract number, and with `AlreadyPersisted` if the
    /// record already carries an identifier.
    async fn insert(&self, transaction: Transaction) -> Result<Transaction>;

    /// Retrieves a transaction by its identifier.
    async fn find_by_id(&self, id: TransactionId) -> Result<Option<Transaction>>;

    /// Retrieves a transaction by its contract number.
    async fn find_by_contract_number(&self, contract_number: &str) -> Result<Option<Transaction>>;

    /// Lists transactions matching a query, newest first.
    async fn find_all(&self, query: TransactionQuery) -> Result<Vec<Transaction>>;

    /// Deletes a transaction by its identifier.
    ///
    /// Fails with `NotFound` if no such transaction exists.
    async fn delete_by_id(&self, id: TransactionId) -> Result<()>;
}

/// Extension trait providing convenience methods for transaction stores.
#[async_trait]
pub trait TransactionStoreExt: TransactionStore {
    /// Lists every transaction of a consumer, newest first.
    async fn find_by_consumer_id(&self, consumer_id: ConsumerId) -> Result<Vec<Transaction>> {
        self.find_all(TransactionQuery::for_consumer(consumer_id))
            .await
    }
}

// Blanket implementation for all TransactionStore implementations
impl<T: TransactionStore + ?Sized> TransactionStoreExt for T {}

#[async_trait]
impl<T: TransactionStore + ?Sized> TransactionStore for std::sync::Arc<T> {
    async fn insert(&self, transaction: Transaction) -> Result<Transaction> {
        (**self).insert(transaction).await
    }

    async fn find_by_id(&self, id: TransactionId) -> Result<Option<Transaction>> {
        (**self).find_by_id(id).await
    }

    async fn find_by_contract_number(&self, contract_number: &str) -> Result<Option<Transaction>> {
        (**self).find_by_contract_number(contract_number).await
    }

    async fn find_all(&self, query: TransactionQuery) -> Result<Vec<Transaction>> {
        (**self).find_all(query).await
    }

    async fn delete_by_id(&self, id: TransactionId) -> Result<()> {
        (**self).delete_by_id(id).await
    }
}

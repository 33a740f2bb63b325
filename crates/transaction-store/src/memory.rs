use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    Result, StoreError, Transaction, TransactionId, TransactionQuery, store::TransactionStore,
};

#[derive(Debug, Default)]
struct Records {
    by_id: BTreeMap<TransactionId, Transaction>,
    next_id: i64,
}

#[derive(Debug, Default)]
struct Faults {
    fail_on_insert: AtomicBool,
    fail_on_delete: AtomicBool,
    insert_delay_ms: AtomicU64,
    insert_count: AtomicUsize,
    delete_count: AtomicUsize,
}

/// In-memory transaction store implementation for testing.
///
/// Provides the same interface as the PostgreSQL implementation, plus
/// fault-injection hooks so saga failure paths can be exercised.
#[derive(Clone, Default)]
pub struct InMemoryTransactionStore {
    records: Arc<RwLock<Records>>,
    faults: Arc<Faults>,
}

impl InMemoryTransactionStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent insert fail with a store error.
    pub fn set_fail_on_insert(&self, fail: bool) {
        self.faults.fail_on_insert.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent delete fail with a store error.
    pub fn set_fail_on_delete(&self, fail: bool) {
        self.faults.fail_on_delete.store(fail, Ordering::SeqCst);
    }

    /// Delays every subsequent insert by `delay` before it commits.
    pub fn set_insert_delay(&self, delay: Duration) {
        self.faults
            .insert_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Returns the number of insert attempts, successful or not.
    pub fn insert_count(&self) -> usize {
        self.faults.insert_count.load(Ordering::SeqCst)
    }

    /// Returns the number of delete attempts, successful or not.
    pub fn delete_count(&self) -> usize {
        self.faults.delete_count.load(Ordering::SeqCst)
    }

    /// Returns the number of stored transactions.
    pub async fn len(&self) -> usize {
        self.records.read().await.by_id.len()
    }

    /// Returns true if no transactions are stored.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.by_id.is_empty()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn insert(&self, mut transaction: Transaction) -> Result<Transaction> {
        self.faults.insert_count.fetch_add(1, Ordering::SeqCst);

        let delay = self.faults.insert_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.faults.fail_on_insert.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("insert rejected".to_string()));
        }

        if let Some(id) = transaction.id {
            return Err(StoreError::AlreadyPersisted(id));
        }

        let mut records = self.records.write().await;

        // Unique constraint simulation
        if records
            .by_id
            .values()
            .any(|t| t.contract_number == transaction.contract_number)
        {
            return Err(StoreError::DuplicateContractNumber(
                transaction.contract_number,
            ));
        }

        records.next_id += 1;
        let id = TransactionId::new(records.next_id);
        transaction.id = Some(id);
        records.by_id.insert(id, transaction.clone());

        Ok(transaction)
    }

    async fn find_by_id(&self, id: TransactionId) -> Result<Option<Transaction>> {
        Ok(self.records.read().await.by_id.get(&id).cloned())
    }

    async fn find_by_contract_number(&self, contract_number: &str) -> Result<Option<Transaction>> {
        let records = self.records.read().await;
        Ok(records
            .by_id
            .values()
            .find(|t| t.contract_number == contract_number)
            .cloned())
    }

    async fn find_all(&self, query: TransactionQuery) -> Result<Vec<Transaction>> {
        let records = self.records.read().await;
        let mut transactions: Vec<_> = records
            .by_id
            .values()
            .filter(|t| query.consumer_id.is_none_or(|c| t.consumer_id == c))
            .cloned()
            .collect();

        // Newest first, id breaks ties between identical timestamps
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let offset = query.offset.unwrap_or(0);
        let transactions = transactions.into_iter().skip(offset);
        let transactions = match query.limit {
            Some(limit) => transactions.take(limit).collect(),
            None => transactions.collect(),
        };

        Ok(transactions)
    }

    async fn delete_by_id(&self, id: TransactionId) -> Result<()> {
        self.faults.delete_count.fetch_add(1, Ordering::SeqCst);

        if self.faults.fail_on_delete.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("delete rejected".to_string()));
        }

        let mut records = self.records.write().await;
        records
            .by_id
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }
}

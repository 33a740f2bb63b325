//! Transaction service: record shaping, persistence and rollback.

use chrono::{DateTime, SubsecRound, Utc};
use common::{ConsumerId, TransactionId};
use transaction_store::{Transaction, TransactionQuery, TransactionStore, TransactionStoreExt};

use crate::command::CreateTransaction;
use crate::contract_number::ContractNumber;
use crate::error::DomainError;

/// Service for managing installment transactions.
///
/// Wraps a [`TransactionStore`] and owns the rules for turning a
/// [`CreateTransaction`] into a record. It never talks to the limit service;
/// sequencing against the remote limit is the saga's job.
#[derive(Debug, Clone)]
pub struct TransactionService<S: TransactionStore> {
    store: S,
}

impl<S: TransactionStore> TransactionService<S> {
    /// Creates a new transaction service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Builds an unsaved transaction with a fresh contract number.
    ///
    /// Both timestamps are set to `now`, truncated to microseconds, the
    /// precision the database keeps.
    pub fn build(&self, cmd: &CreateTransaction, now: DateTime<Utc>) -> Transaction {
        let now = now.trunc_subsecs(6);
        let contract_number = ContractNumber::generate(cmd.consumer_id, now);

        Transaction::builder()
            .contract_number(contract_number.into_string())
            .consumer_id(cmd.consumer_id)
            .tenor(cmd.tenor)
            .otr(cmd.otr)
            .admin_fee(cmd.admin_fee)
            .installment(cmd.installment)
            .interest(cmd.interest)
            .asset_name(cmd.asset_name.clone())
            .timestamps(now)
            .build()
    }

    /// Inserts a built transaction and returns it with its store id.
    #[tracing::instrument(skip(self, transaction), fields(contract_number = %transaction.contract_number))]
    pub async fn persist(&self, transaction: Transaction) -> Result<Transaction, DomainError> {
        match self.store.insert(transaction).await {
            Ok(persisted) => {
                metrics::counter!("transactions_persisted_total").increment(1);
                Ok(persisted)
            }
            Err(e) => {
                metrics::counter!("store_failures_total", "operation" => "insert").increment(1);
                tracing::error!(error = %e, "failed to persist transaction");
                Err(e.into())
            }
        }
    }

    /// Validates, builds and persists a transaction in one go.
    ///
    /// Performs no limit check; callers that need one go through the saga.
    pub async fn create(&self, cmd: &CreateTransaction) -> Result<Transaction, DomainError> {
        cmd.validate()?;
        let transaction = self.build(cmd, Utc::now());
        self.persist(transaction).await
    }

    /// Deletes a persisted transaction.
    ///
    /// Used both for saga compensation and for administrative rollback.
    #[tracing::instrument(skip(self))]
    pub async fn rollback(&self, id: TransactionId) -> Result<(), DomainError> {
        match self.store.delete_by_id(id).await {
            Ok(()) => {
                metrics::counter!("transactions_rolled_back_total").increment(1);
                tracing::info!("transaction rolled back");
                Ok(())
            }
            Err(e) => {
                metrics::counter!("store_failures_total", "operation" => "delete").increment(1);
                tracing::error!(error = %e, "failed to roll back transaction");
                Err(e.into())
            }
        }
    }

    /// Lists transactions, newest first.
    pub async fn find_all(&self, query: TransactionQuery) -> Result<Vec<Transaction>, DomainError> {
        self.store.find_all(query).await.map_err(|e| {
            tracing::error!(error = %e, "failed to list transactions");
            e.into()
        })
    }

    /// Lists a consumer's transactions, newest first.
    pub async fn find_by_consumer_id(
        &self,
        consumer_id: ConsumerId,
    ) -> Result<Vec<Transaction>, DomainError> {
        self.store
            .find_by_consumer_id(consumer_id)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, %consumer_id, "failed to list consumer transactions");
                e.into()
            })
    }

    /// Loads a transaction by id, or `NotFound`.
    pub async fn find_by_id(&self, id: TransactionId) -> Result<Transaction, DomainError> {
        self.store
            .find_by_id(id)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, %id, "failed to load transaction");
                DomainError::from(e)
            })?
            .ok_or(DomainError::NotFound)
    }

    /// Loads a transaction by contract number, or `NotFound`.
    pub async fn find_by_contract_number(
        &self,
        contract_number: &str,
    ) -> Result<Transaction, DomainError> {
        self.store
            .find_by_contract_number(contract_number)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, contract_number, "failed to load transaction");
                DomainError::from(e)
            })?
            .ok_or(DomainError::NotFound)
    }
}

//! Saga coordinator for the transaction-creation saga.

use std::time::Instant;

use chrono::Utc;
use common::{Amount, TransactionId};
use domain::{CreateTransaction, DomainError, TransactionService};
use transaction_store::{StoreError, Transaction, TransactionStore};

use crate::cancel::CancelSignal;
use crate::creation::{self, ExecutionMode};
use crate::error::SagaError;
use crate::outcome::SagaOutcome;
use crate::services::{LimitService, LimitServiceError};
use crate::state::SagaState;

/// Orchestrates transaction-creation sagas.
///
/// One run checks the consumer's remote limit, persists the transaction,
/// then confirms by decrementing the remote limit. If the confirmation
/// fails the persisted transaction is deleted, exactly once. Runs share no
/// state with each other.
pub struct SagaCoordinator<S, L>
where
    S: TransactionStore,
    L: LimitService,
{
    transactions: TransactionService<S>,
    limits: L,
    mode: ExecutionMode,
}

impl<S, L> SagaCoordinator<S, L>
where
    S: TransactionStore,
    L: LimitService,
{
    /// Creates a coordinator running in sequential mode.
    pub fn new(store: S, limits: L) -> Self {
        Self {
            transactions: TransactionService::new(store),
            limits,
            mode: ExecutionMode::default(),
        }
    }

    /// Sets how persist and confirm are scheduled.
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Returns the transaction service used for persist and rollback.
    pub fn transactions(&self) -> &TransactionService<S> {
        &self.transactions
    }

    pub fn limits(&self) -> &L {
        &self.limits
    }

    /// Runs one transaction-creation saga.
    ///
    /// Returns the persisted transaction on success. On failure the error's
    /// [`SagaError::outcome`] tells whether anything was compensated. Remote
    /// limit calls are abandoned when `cancel` fires; a transaction that was
    /// already persisted is still compensated.
    #[tracing::instrument(
        skip(self, cmd, cancel),
        fields(
            saga_type = creation::SAGA_TYPE,
            mode = %self.mode,
            consumer_id = %cmd.consumer_id,
            tenor = %cmd.tenor,
        )
    )]
    pub async fn create_transaction(
        &self,
        cmd: CreateTransaction,
        cancel: CancelSignal,
    ) -> Result<Transaction, SagaError> {
        metrics::counter!("saga_executions_total").increment(1);
        let saga_start = Instant::now();

        let result = self.run(&cmd, &cancel).await;

        let duration = saga_start.elapsed().as_secs_f64();
        metrics::histogram!("saga_duration_seconds").record(duration);

        match &result {
            Ok(transaction) => {
                metrics::counter!(outcome_counter(SagaOutcome::Succeeded)).increment(1);
                tracing::info!(
                    contract_number = %transaction.contract_number,
                    duration,
                    "saga completed successfully"
                );
            }
            Err(e) => {
                let outcome = e.outcome();
                metrics::counter!(outcome_counter(outcome)).increment(1);
                if outcome.is_inconsistent() {
                    tracing::error!(
                        error = %e,
                        %outcome,
                        "saga left local and remote state inconsistent, operator action required"
                    );
                } else {
                    tracing::warn!(error = %e, %outcome, "saga failed");
                }
            }
        }

        result
    }

    async fn run(
        &self,
        cmd: &CreateTransaction,
        cancel: &CancelSignal,
    ) -> Result<Transaction, SagaError> {
        cmd.validate()?;
        let mut state = SagaState::Start;

        if cancel.is_cancelled() {
            return Err(SagaError::Cancelled);
        }

        // Step 1: Check limit
        tracing::info!(step = creation::STEP_CHECK_LIMIT, "saga step started");
        let available = cancel
            .run(
                self.limits
                    .get_available_limit(cmd.consumer_id, cmd.tenor),
            )
            .await
            .unwrap_or(Err(LimitServiceError::Cancelled))
            .inspect_err(|e| count_limit_failure("get_available_limit", e))
            .map_err(SagaError::from_limit_check)?;

        if available < cmd.otr {
            return Err(SagaError::InsufficientLimit {
                consumer_id: cmd.consumer_id,
                tenor: cmd.tenor,
                available,
                requested: cmd.otr,
            });
        }
        advance(&mut state, SagaState::LimitChecked);

        // Nothing is written past this point once cancelled.
        if cancel.is_cancelled() {
            return Err(SagaError::Cancelled);
        }

        let transaction = self.transactions.build(cmd, Utc::now());

        match self.mode {
            ExecutionMode::Sequential => {
                self.persist_then_confirm(cmd, transaction, cancel, state)
                    .await
            }
            ExecutionMode::Concurrent => {
                self.persist_and_confirm(cmd, transaction, cancel, state)
                    .await
            }
        }
    }

    /// Steps 2 and 3 in order: confirm starts only after persist succeeded.
    async fn persist_then_confirm(
        &self,
        cmd: &CreateTransaction,
        transaction: Transaction,
        cancel: &CancelSignal,
        mut state: SagaState,
    ) -> Result<Transaction, SagaError> {
        tracing::info!(
            step = creation::STEP_PERSIST_TRANSACTION,
            "saga step started"
        );
        let (id, persisted) = self.persist(transaction).await?;
        advance(&mut state, SagaState::Persisted);

        tracing::info!(step = creation::STEP_CONFIRM_LIMIT, "saga step started");
        match self.confirm(cmd, cancel).await {
            Ok(remaining) => {
                advance(&mut state, SagaState::Confirmed);
                tracing::debug!(%remaining, "limit decremented");
                advance(&mut state, SagaState::Done);
                Ok(persisted)
            }
            Err(confirm_error) => {
                self.compensate(id, persisted, confirm_error, state).await
            }
        }
    }

    /// Steps 2 and 3 together. Both branches always run to completion
    /// before either result is inspected.
    async fn persist_and_confirm(
        &self,
        cmd: &CreateTransaction,
        transaction: Transaction,
        cancel: &CancelSignal,
        mut state: SagaState,
    ) -> Result<Transaction, SagaError> {
        tracing::info!(
            step = creation::STEP_PERSIST_TRANSACTION,
            parallel_with = creation::STEP_CONFIRM_LIMIT,
            "saga step started"
        );
        let (persisted, confirmed) =
            tokio::join!(self.persist(transaction), self.confirm(cmd, cancel));

        match (persisted, confirmed) {
            (Ok((_, persisted)), Ok(remaining)) => {
                advance(&mut state, SagaState::Persisted);
                advance(&mut state, SagaState::Confirmed);
                tracing::debug!(%remaining, "limit decremented");
                advance(&mut state, SagaState::Done);
                Ok(persisted)
            }
            (Ok((id, persisted)), Err(confirm_error)) => {
                advance(&mut state, SagaState::Persisted);
                self.compensate(id, persisted, confirm_error, state).await
            }
            (Err(persist_error), Ok(remaining)) => {
                tracing::error!(
                    error = %persist_error,
                    %remaining,
                    "limit decremented but transaction not persisted"
                );
                Err(SagaError::UnreconciledDecrement {
                    consumer_id: cmd.consumer_id,
                    tenor: cmd.tenor,
                    amount: cmd.otr,
                    source: Box::new(persist_error),
                })
            }
            (Err(persist_error), Err(confirm_error)) => {
                tracing::warn!(
                    error = %confirm_error,
                    "limit confirmation also failed, nothing to compensate"
                );
                Err(persist_error)
            }
        }
    }

    /// Step 2. Never raced against cancellation: once started, its commit
    /// status must be known.
    async fn persist(
        &self,
        transaction: Transaction,
    ) -> Result<(TransactionId, Transaction), SagaError> {
        let persisted = self
            .transactions
            .persist(transaction)
            .await
            .map_err(SagaError::from_persist)?;

        let id = persisted.id.ok_or_else(|| {
            SagaError::StoreFault(DomainError::Store(StoreError::Unavailable(
                "store returned no identifier".to_string(),
            )))
        })?;

        Ok((id, persisted))
    }

    /// Step 3. Cancellation counts as a failed confirmation.
    async fn confirm(
        &self,
        cmd: &CreateTransaction,
        cancel: &CancelSignal,
    ) -> Result<Amount, LimitServiceError> {
        cancel
            .run(
                self.limits
                    .decrement_available_limit(cmd.consumer_id, cmd.tenor, cmd.otr),
            )
            .await
            .unwrap_or(Err(LimitServiceError::Cancelled))
            .inspect_err(|e| count_limit_failure("decrement_available_limit", e))
    }

    /// Step 4. Attempted exactly once and never cancelled.
    #[tracing::instrument(skip(self, transaction, state), fields(contract_number = %transaction.contract_number))]
    async fn compensate(
        &self,
        id: TransactionId,
        transaction: Transaction,
        confirm_error: LimitServiceError,
        mut state: SagaState,
    ) -> Result<Transaction, SagaError> {
        tracing::warn!(
            step = creation::STEP_ROLLBACK_TRANSACTION,
            error = %confirm_error,
            "limit confirmation failed, compensating"
        );
        advance(&mut state, SagaState::Compensating);

        let result = match self.transactions.rollback(id).await {
            Ok(()) => Err(SagaError::ConfirmationFailed {
                transaction_id: id,
                contract_number: transaction.contract_number,
                source: confirm_error,
            }),
            Err(source) => Err(SagaError::CompensationFault {
                transaction_id: id,
                contract_number: transaction.contract_number,
                confirm_error,
                source,
            }),
        };
        advance(&mut state, SagaState::Done);

        result
    }
}

fn outcome_counter(outcome: SagaOutcome) -> &'static str {
    match outcome {
        SagaOutcome::Succeeded => "saga_completed",
        SagaOutcome::RejectedInsufficientLimit => "saga_rejected",
        SagaOutcome::Aborted => "saga_aborted",
        SagaOutcome::FailedCompensated => "saga_compensated",
        SagaOutcome::FailedCompensationFailed => "saga_compensation_failed",
    }
}

fn count_limit_failure(operation: &'static str, error: &LimitServiceError) {
    let kind = match error {
        LimitServiceError::ConsumerLimitNotFound { .. } => "not_found",
        LimitServiceError::Unavailable(_) => "unavailable",
        LimitServiceError::InvalidResponse(_) => "invalid_response",
        LimitServiceError::Rejected(_) => "rejected",
        LimitServiceError::Cancelled => "cancelled",
    };
    metrics::counter!("limit_service_failures_total", "operation" => operation, "kind" => kind)
        .increment(1);
}

fn advance(state: &mut SagaState, next: SagaState) {
    debug_assert!(
        state.can_transition_to(next),
        "illegal saga transition {state} -> {next}"
    );
    tracing::debug!(from = %state, to = %next, "saga state changed");
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_outcome_has_its_own_counter() {
        let outcomes = [
            SagaOutcome::Succeeded,
            SagaOutcome::RejectedInsufficientLimit,
            SagaOutcome::Aborted,
            SagaOutcome::FailedCompensated,
            SagaOutcome::FailedCompensationFailed,
        ];
        let mut names: Vec<_> = outcomes.iter().map(|o| outcome_counter(*o)).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), outcomes.len());

        assert_eq!(
            outcome_counter(SagaOutcome::FailedCompensationFailed),
            "saga_compensation_failed"
        );
    }
}

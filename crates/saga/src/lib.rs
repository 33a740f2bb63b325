//! Saga orchestration for installment-transaction creation.
//!
//! The transaction-creation saga follows these steps:
//! 1. Check the consumer's available limit with the limit service
//! 2. Persist the transaction
//! 3. Confirm by decrementing the remote limit
//!
//! If step 3 fails, the transaction persisted in step 2 is deleted. Steps 2
//! and 3 run either one after the other or joined concurrently, see
//! [`ExecutionMode`].

pub mod cancel;
pub mod coordinator;
pub mod creation;
pub mod error;
pub mod outcome;
pub mod services;
pub mod state;

pub use cancel::{CancelHandle, CancelOnDrop, CancelSignal, cancel_pair};
pub use coordinator::SagaCoordinator;
pub use creation::{ExecutionMode, ParseExecutionModeError};
pub use error::{Result, SagaError};
pub use outcome::SagaOutcome;
pub use services::{HttpLimitServiceClient, InMemoryLimitService, LimitService, LimitServiceError};
pub use state::SagaState;

//! Domain layer for installment transactions.
//!
//! This crate provides:
//! - Contract number generation and parsing
//! - The `CreateTransaction` command with request validation
//! - `TransactionService`, which builds, persists and rolls back transactions

pub mod command;
pub mod contract_number;
pub mod error;
pub mod service;

pub use command::CreateTransaction;
pub use contract_number::ContractNumber;
pub use error::DomainError;
pub use service::TransactionService;

//! Shared value types used across the transaction service crates.

mod types;

pub use types::{Amount, ConsumerId, Tenor, TransactionId};

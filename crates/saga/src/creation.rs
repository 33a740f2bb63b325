//! Transaction-creation saga constants and execution mode.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The saga type identifier for transaction creation.
pub const SAGA_TYPE: &str = "TransactionCreation";

/// Step name: Check the consumer's available limit.
pub const STEP_CHECK_LIMIT: &str = "check_limit";

/// Step name: Persist the transaction.
pub const STEP_PERSIST_TRANSACTION: &str = "persist_transaction";

/// Step name: Decrement the consumer's available limit.
pub const STEP_CONFIRM_LIMIT: &str = "confirm_limit";

/// Compensation step name: Delete the persisted transaction.
pub const STEP_ROLLBACK_TRANSACTION: &str = "rollback_transaction";

/// How the persist and confirm steps are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Confirm starts after persist has succeeded.
    #[default]
    Sequential,

    /// Persist and confirm run together and are joined before any decision.
    Concurrent,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Sequential => "sequential",
            ExecutionMode::Concurrent => "concurrent",
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when an execution mode name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown saga execution mode: {0}")]
pub struct ParseExecutionModeError(pub String);

impl FromStr for ExecutionMode {
    type Err = ParseExecutionModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(ExecutionMode::Sequential),
            "concurrent" => Ok(ExecutionMode::Concurrent),
            _ => Err(ParseExecutionModeError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(
            "Concurrent".parse::<ExecutionMode>(),
            Ok(ExecutionMode::Concurrent)
        );
        assert_eq!(
            " SEQUENTIAL ".parse::<ExecutionMode>(),
            Ok(ExecutionMode::Sequential)
        );
    }

    #[test]
    fn rejects_unknown_modes() {
        assert_eq!(
            "parallel".parse::<ExecutionMode>(),
            Err(ParseExecutionModeError("parallel".to_string()))
        );
    }

    #[test]
    fn default_is_sequential() {
        assert_eq!(ExecutionMode::default(), ExecutionMode::Sequential);
        assert_eq!(ExecutionMode::default().to_string(), "sequential");
    }
}

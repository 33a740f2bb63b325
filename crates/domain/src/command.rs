//! Commands accepted by the transaction domain.

use common::{Amount, ConsumerId, Tenor};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Request to open a new installment transaction for a consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTransaction {
    pub consumer_id: ConsumerId,
    pub tenor: Tenor,

    /// Principal being financed. This is the amount checked against and
    /// decremented from the consumer's limit.
    pub otr: Amount,

    #[serde(default)]
    pub admin_fee: Amount,

    #[serde(default)]
    pub installment: Amount,

    #[serde(default)]
    pub interest: Amount,

    pub asset_name: String,
}

impl CreateTransaction {
    /// Creates a command with zero fees, installment and interest.
    pub fn new(
        consumer_id: ConsumerId,
        tenor: Tenor,
        otr: Amount,
        asset_name: impl Into<String>,
    ) -> Self {
        Self {
            consumer_id,
            tenor,
            otr,
            admin_fee: Amount::zero(),
            installment: Amount::zero(),
            interest: Amount::zero(),
            asset_name: asset_name.into(),
        }
    }

    pub fn with_admin_fee(mut self, admin_fee: Amount) -> Self {
        self.admin_fee = admin_fee;
        self
    }

    pub fn with_installment(mut self, installment: Amount) -> Self {
        self.installment = installment;
        self
    }

    pub fn with_interest(mut self, interest: Amount) -> Self {
        self.interest = interest;
        self
    }

    /// Checks the local preconditions of a creation request.
    ///
    /// Whether the consumer exists is decided by the limit service, not here.
    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.tenor.is_valid() {
            return Err(DomainError::InvalidRequest(
                "tenor must be greater than zero".to_string(),
            ));
        }
        if self.otr.is_zero() {
            return Err(DomainError::InvalidRequest(
                "otr must be greater than zero".to_string(),
            ));
        }
        if self.asset_name.trim().is_empty() {
            return Err(DomainError::InvalidRequest(
                "asset_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

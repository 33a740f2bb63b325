use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Amount, ConsumerId, Tenor, TransactionId};

/// An installment purchase transaction.
///
/// `id` is `None` until the store has inserted the record. The contract
/// number is assigned once at build time and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Store-assigned identifier.
    pub id: Option<TransactionId>,

    /// Globally unique contract number.
    pub contract_number: String,

    /// Consumer the purchase is financed for.
    pub consumer_id: ConsumerId,

    /// Number of installment periods.
    pub tenor: Tenor,

    /// Principal (on-the-road price) being financed.
    pub otr: Amount,

    pub admin_fee: Amount,

    /// Amount due per period.
    pub installment: Amount,

    pub interest: Amount,

    /// Description of the financed asset.
    pub asset_name: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Creates a new transaction builder.
    pub fn builder() -> TransactionBuilder {
        TransactionBuilder::default()
    }

    /// Returns true once the store has assigned an identifier.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

/// Builder for constructing transactions.
#[derive(Debug, Default)]
pub struct TransactionBuilder {
    id: Option<TransactionId>,
    contract_number: Option<String>,
    consumer_id: Option<ConsumerId>,
    tenor: Option<Tenor>,
    otr: Option<Amount>,
    admin_fee: Amount,
    installment: Amount,
    interest: Amount,
    asset_name: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl TransactionBuilder {
    /// Sets the store identifier. Only stores and tests should call this.
    pub fn id(mut self, id: TransactionId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn contract_number(mut self, contract_number: impl Into<String>) -> Self {
        self.contract_number = Some(contract_number.into());
        self
    }

    pub fn consumer_id(mut self, consumer_id: ConsumerId) -> Self {
        self.consumer_id = Some(consumer_id);
        self
    }

    pub fn tenor(mut self, tenor: Tenor) -> Self {
        self.tenor = Some(tenor);
        self
    }

    pub fn otr(mut self, otr: Amount) -> Self {
        self.otr = Some(otr);
        self
    }

    pub fn admin_fee(mut self, admin_fee: Amount) -> Self {
        self.admin_fee = admin_fee;
        self
    }

    pub fn installment(mut self, installment: Amount) -> Self {
        self.installment = installment;
        self
    }

    pub fn interest(mut self, interest: Amount) -> Self {
        self.interest = interest;
        self
    }

    pub fn asset_name(mut self, asset_name: impl Into<String>) -> Self {
        self.asset_name = Some(asset_name.into());
        self
    }

    /// Sets both timestamps. If not set, the current time will be used.
    pub fn timestamps(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self.updated_at = Some(at);
        self
    }

    /// Builds the transaction.
    ///
    /// # Panics
    ///
    /// Panics if required fields (contract_number, consumer_id, tenor, otr, asset_name)
    /// are not set.
    pub fn build(self) -> Transaction {
        let created_at = self.created_at.unwrap_or_else(Utc::now);
        Transaction {
            id: self.id,
            contract_number: self.contract_number.expect("contract_number is required"),
            consumer_id: self.consumer_id.expect("consumer_id is required"),
            tenor: self.tenor.expect("tenor is required"),
            otr: self.otr.expect("otr is required"),
            admin_fee: self.admin_fee,
            installment: self.installment,
            interest: self.interest,
            asset_name: self.asset_name.expect("asset_name is required"),
            created_at,
            updated_at: self.updated_at.unwrap_or(created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TransactionBuilder {
        Transaction::builder()
            .contract_number("CNTR-20260101-00000001-abc")
            .consumer_id(ConsumerId::new(1))
            .tenor(Tenor::new(6))
            .otr(Amount::new(50_000))
            .asset_name("Motorcycle")
    }

    #[test]
    fn builder_defaults_fees_to_zero_and_leaves_id_unset() {
        let tx = sample().build();
        assert!(tx.id.is_none());
        assert!(!tx.is_persisted());
        assert_eq!(tx.admin_fee, Amount::zero());
        assert_eq!(tx.installment, Amount::zero());
        assert_eq!(tx.interest, Amount::zero());
        assert_eq!(tx.created_at, tx.updated_at);
    }

    #[test]
    fn timestamps_apply_to_both_fields() {
        let at = Utc::now() - chrono::Duration::days(1);
        let tx = sample().timestamps(at).build();
        assert_eq!(tx.created_at, at);
        assert_eq!(tx.updated_at, at);
    }

    #[test]
    #[should_panic(expected = "asset_name is required")]
    fn build_panics_without_asset_name() {
        Transaction::builder()
            .contract_number("CNTR-X")
            .consumer_id(ConsumerId::new(1))
            .tenor(Tenor::new(6))
            .otr(Amount::new(1))
            .build();
    }

    #[test]
    fn serializes_with_snake_case_fields() {
        let tx = sample().id(TransactionId::new(3)).build();
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["contract_number"], "CNTR-20260101-00000001-abc");
        assert_eq!(json["otr"], 50_000);
        assert_eq!(json["asset_name"], "Motorcycle");
    }
}

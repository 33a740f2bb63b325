use serde::{Deserialize, Serialize};

/// Store-assigned identifier of a persisted transaction.
///
/// Never generated by callers; a transaction only carries one after the
/// store has inserted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(i64);

impl TransactionId {
    /// Wraps a raw store identifier.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TransactionId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Identifier of a consumer known to the limit service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsumerId(u64);

impl ConsumerId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ConsumerId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Number of installment periods of a financed purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tenor(u32);

impl Tenor {
    pub fn new(periods: u32) -> Self {
        Self(periods)
    }

    /// Returns the number of periods.
    pub fn periods(&self) -> u32 {
        self.0
    }

    /// A tenor is only usable for financing when it has at least one period.
    pub fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl std::fmt::Display for Tenor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Tenor {
    fn from(periods: u32) -> Self {
        Self(periods)
    }
}

/// Non-negative monetary amount in whole currency units.
///
/// Used for the principal (OTR), fees, installments, interest and limit
/// snapshots. The unsigned representation makes negative amounts
/// unrepresentable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Subtracts `other`, returning `None` if the result would be negative.
    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenor_validity() {
        assert!(!Tenor::new(0).is_valid());
        assert!(Tenor::new(1).is_valid());
        assert!(Tenor::new(36).is_valid());
    }

    #[test]
    fn amount_checked_sub_refuses_negative_results() {
        let limit = Amount::new(10_000);
        assert_eq!(limit.checked_sub(Amount::new(4_000)), Some(Amount::new(6_000)));
        assert_eq!(limit.checked_sub(Amount::new(10_000)), Some(Amount::zero()));
        assert_eq!(limit.checked_sub(Amount::new(10_001)), None);
    }

    #[test]
    fn amount_ordering_compares_values() {
        assert!(Amount::new(10_000) < Amount::new(50_000));
        assert!(Amount::new(100_000) >= Amount::new(50_000));
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&ConsumerId::new(7)).unwrap();
        assert_eq!(json, "7");
        let id: TransactionId = serde_json::from_str("42").unwrap();
        assert_eq!(id, TransactionId::new(42));
        let amount: Amount = serde_json::from_str("50000").unwrap();
        assert_eq!(amount, Amount::new(50_000));
    }

    #[test]
    fn display_renders_raw_values() {
        assert_eq!(ConsumerId::new(1).to_string(), "1");
        assert_eq!(Tenor::new(6).to_string(), "6");
        assert_eq!(TransactionId::new(99).to_string(), "99");
    }
}

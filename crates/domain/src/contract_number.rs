//! Contract number generation.
//!
//! Layout: `CNTR-<YYYYMMDD>-<consumer id, zero padded to 8>-<token>`, for
//! example `CNTR-20261018-00000001-3f9a1c07b2d4`.
//!
//! The token is the first 12 hex digits of a v4 UUID (48 random bits). Since
//! the date and consumer id are part of the number, two numbers can only
//! collide for the same consumer on the same day, with probability about
//! `n^2 / 2^49` for `n` contracts. The store still enforces uniqueness.

use chrono::{DateTime, NaiveDate, Utc};
use common::ConsumerId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Prefix of every contract number.
pub const PREFIX: &str = "CNTR";

/// Number of hex digits in the random token.
pub const TOKEN_LEN: usize = 12;

const DATE_FORMAT: &str = "%Y%m%d";

/// A validated contract number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContractNumber {
    value: String,
    date: NaiveDate,
    consumer_id: ConsumerId,
}

impl ContractNumber {
    /// Generates a fresh contract number for a consumer, dated `at` (UTC).
    ///
    /// Needs no round trip to the store.
    pub fn generate(consumer_id: ConsumerId, at: DateTime<Utc>) -> Self {
        let token = Uuid::new_v4().simple().to_string();
        Self::with_token(consumer_id, at.date_naive(), &token[..TOKEN_LEN])
    }

    fn with_token(consumer_id: ConsumerId, date: NaiveDate, token: &str) -> Self {
        let value = format!(
            "{PREFIX}-{}-{:08}-{token}",
            date.format(DATE_FORMAT),
            consumer_id.as_u64()
        );
        Self {
            value,
            date,
            consumer_id,
        }
    }

    /// Parses and validates an existing contract number.
    ///
    /// Accepts any non-empty alphanumeric token so numbers issued with
    /// shorter numeric suffixes remain readable.
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        let malformed = || DomainError::MalformedContractNumber(value.to_string());

        let mut parts = value.split('-');
        let (Some(prefix), Some(date), Some(consumer), Some(token), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(malformed());
        };

        if prefix != PREFIX {
            return Err(malformed());
        }

        if date.len() != 8 {
            return Err(malformed());
        }
        let date = NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|_| malformed())?;

        if consumer.len() < 8 || !consumer.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let consumer_id = consumer
            .parse::<u64>()
            .map(ConsumerId::new)
            .map_err(|_| malformed())?;

        if token.is_empty() || !token.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(malformed());
        }

        Ok(Self {
            value: value.to_string(),
            date,
            consumer_id,
        })
    }

    /// Returns the contract number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Returns the creation date embedded in the number.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Returns the consumer embedded in the number.
    pub fn consumer_id(&self) -> ConsumerId {
        self.consumer_id
    }

    /// Returns the unique token suffix.
    pub fn token(&self) -> &str {
        self.value.rsplit('-').next().unwrap_or_default()
    }

    pub fn into_string(self) -> String {
        self.value
    }
}

impl std::fmt::Display for ContractNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

impl TryFrom<String> for ContractNumber {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContractNumber> for String {
    fn from(number: ContractNumber) -> Self {
        number.value
    }
}

impl AsRef<str> for ContractNumber {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::TimeZone;

    use super::*;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 10, 30, 0).unwrap()
    }

    #[test]
    fn generate_follows_layout() {
        let number = ContractNumber::generate(ConsumerId::new(1), at(2026, 10, 18));
        let s = number.as_str();

        assert!(s.starts_with("CNTR-20261018-00000001-"), "got {s}");
        assert_eq!(number.token().len(), TOKEN_LEN);
        assert!(number.token().bytes().all(|b| b.is_ascii_hexdigit()));
        assert_eq!(number.date(), NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        assert_eq!(number.consumer_id(), ConsumerId::new(1));
    }

    #[test]
    fn wide_consumer_ids_are_not_truncated() {
        let number = ContractNumber::generate(ConsumerId::new(1_234_567_890), at(2026, 1, 2));
        assert!(number.as_str().starts_with("CNTR-20260102-1234567890-"));
    }

    #[test]
    fn generated_numbers_do_not_collide() {
        let now = at(2026, 10, 18);
        let numbers: HashSet<_> = (0..10_000)
            .map(|_| ContractNumber::generate(ConsumerId::new(7), now).into_string())
            .collect();
        assert_eq!(numbers.len(), 10_000);
    }

    #[test]
    fn parse_round_trips_generated_numbers() {
        let number = ContractNumber::generate(ConsumerId::new(42), at(2026, 3, 9));
        let parsed = ContractNumber::parse(number.as_str()).unwrap();
        assert_eq!(parsed, number);
    }

    #[test]
    fn parse_accepts_short_numeric_tokens() {
        let parsed = ContractNumber::parse("CNTR-20240131-00000003-87").unwrap();
        assert_eq!(parsed.token(), "87");
        assert_eq!(parsed.consumer_id(), ConsumerId::new(3));
    }

    #[test]
    fn parse_rejects_malformed_numbers() {
        for bad in [
            "",
            "CNTR",
            "XXXX-20240131-00000003-87",
            "CNTR-2024013-00000003-87",
            "CNTR-20241331-00000003-87",
            "CNTR-20240131-0003-87",
            "CNTR-20240131-0000000a-87",
            "CNTR-20240131-00000003-",
            "CNTR-20240131-00000003-8_7",
            "CNTR-20240131-00000003-87-extra",
        ] {
            assert!(
                matches!(
                    ContractNumber::parse(bad),
                    Err(DomainError::MalformedContractNumber(_))
                ),
                "accepted {bad:?}"
            );
        }
    }
}

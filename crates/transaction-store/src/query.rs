use crate::ConsumerId;

/// Builder for listing transactions.
///
/// Results are always ordered newest `created_at` first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionQuery {
    /// Filter by consumer.
    pub consumer_id: Option<ConsumerId>,

    /// Maximum number of transactions to return.
    pub limit: Option<usize>,

    /// Number of transactions to skip.
    pub offset: Option<usize>,
}

impl TransactionQuery {
    /// Creates a new empty query matching every transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for a single consumer's transactions.
    pub fn for_consumer(consumer_id: ConsumerId) -> Self {
        Self {
            consumer_id: Some(consumer_id),
            ..Default::default()
        }
    }

    /// Filters by consumer.
    pub fn consumer_id(mut self, consumer_id: ConsumerId) -> Self {
        self.consumer_id = Some(consumer_id);
        self
    }

    /// Limits the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips the first `offset` results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

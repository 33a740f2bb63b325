//! Limit service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use common::{Amount, ConsumerId, Tenor};
use thiserror::Error;

/// Errors returned by a limit service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimitServiceError {
    /// The service holds no limit for this consumer and tenor.
    #[error("Consumer limit not found for consumer {consumer_id}, tenor {tenor}")]
    ConsumerLimitNotFound { consumer_id: ConsumerId, tenor: Tenor },

    /// The call did not complete (transport failure, 5xx, timeout).
    #[error("Limit service unavailable: {0}")]
    Unavailable(String),

    /// The service answered with a body that could not be understood.
    #[error("Invalid limit service response: {0}")]
    InvalidResponse(String),

    /// The service refused the decrement, typically because it would overdraw.
    #[error("Limit decrement rejected: {0}")]
    Rejected(String),

    /// The caller cancelled before the call completed.
    #[error("Limit service call cancelled")]
    Cancelled,
}

/// Remote peer owning consumers' credit limits.
///
/// The two operations are independent; there is no combined
/// check-and-reserve primitive. Implementations should make
/// `decrement_available_limit` reject over-limit decrements atomically.
#[async_trait]
pub trait LimitService: Send + Sync {
    /// Returns the available limit for a consumer and tenor.
    async fn get_available_limit(
        &self,
        consumer_id: ConsumerId,
        tenor: Tenor,
    ) -> Result<Amount, LimitServiceError>;

    /// Decrements the available limit and returns the new available amount.
    async fn decrement_available_limit(
        &self,
        consumer_id: ConsumerId,
        tenor: Tenor,
        amount: Amount,
    ) -> Result<Amount, LimitServiceError>;
}

#[async_trait]
impl<T: LimitService + ?Sized> LimitService for Arc<T> {
    async fn get_available_limit(
        &self,
        consumer_id: ConsumerId,
        tenor: Tenor,
    ) -> Result<Amount, LimitServiceError> {
        (**self).get_available_limit(consumer_id, tenor).await
    }

    async fn decrement_available_limit(
        &self,
        consumer_id: ConsumerId,
        tenor: Tenor,
        amount: Amount,
    ) -> Result<Amount, LimitServiceError> {
        (**self)
            .decrement_available_limit(consumer_id, tenor, amount)
            .await
    }
}

#[derive(Debug, Default)]
struct Controls {
    fail_on_get: AtomicBool,
    fail_on_decrement: AtomicBool,
    get_delay_ms: AtomicU64,
    decrement_delay_ms: AtomicU64,
    get_count: AtomicUsize,
    decrement_count: AtomicUsize,
}

/// In-memory limit service for testing and local runs.
///
/// Decrements are checked and applied under one lock, so concurrent
/// decrements can never overdraw a limit.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLimitService {
    limits: Arc<RwLock<HashMap<(ConsumerId, Tenor), Amount>>>,
    controls: Arc<Controls>,
}

impl InMemoryLimitService {
    /// Creates a new in-memory limit service with no limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the available limit for a consumer and tenor.
    pub fn set_limit(&self, consumer_id: ConsumerId, tenor: Tenor, amount: Amount) {
        self.limits
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((consumer_id, tenor), amount);
    }

    /// Returns the currently available limit, if one is set.
    pub fn available_limit(&self, consumer_id: ConsumerId, tenor: Tenor) -> Option<Amount> {
        self.limits
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(consumer_id, tenor))
            .copied()
    }

    /// Makes every subsequent limit lookup fail as unavailable.
    pub fn set_fail_on_get(&self, fail: bool) {
        self.controls.fail_on_get.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent decrement fail as unavailable.
    pub fn set_fail_on_decrement(&self, fail: bool) {
        self.controls.fail_on_decrement.store(fail, Ordering::SeqCst);
    }

    /// Delays every subsequent limit lookup.
    pub fn set_get_delay(&self, delay: Duration) {
        self.controls
            .get_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Delays every subsequent decrement before it is applied.
    pub fn set_decrement_delay(&self, delay: Duration) {
        self.controls
            .decrement_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of limit lookups attempted.
    pub fn get_count(&self) -> usize {
        self.controls.get_count.load(Ordering::SeqCst)
    }

    /// Number of decrements attempted, successful or not.
    pub fn decrement_count(&self) -> usize {
        self.controls.decrement_count.load(Ordering::SeqCst)
    }

    async fn pause(delay_ms: &AtomicU64) {
        let delay = delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }
}

#[async_trait]
impl LimitService for InMemoryLimitService {
    async fn get_available_limit(
        &self,
        consumer_id: ConsumerId,
        tenor: Tenor,
    ) -> Result<Amount, LimitServiceError> {
        self.controls.get_count.fetch_add(1, Ordering::SeqCst);
        Self::pause(&self.controls.get_delay_ms).await;

        if self.controls.fail_on_get.load(Ordering::SeqCst) {
            return Err(LimitServiceError::Unavailable(
                "limit lookup failed".to_string(),
            ));
        }

        self.available_limit(consumer_id, tenor)
            .ok_or(LimitServiceError::ConsumerLimitNotFound { consumer_id, tenor })
    }

    async fn decrement_available_limit(
        &self,
        consumer_id: ConsumerId,
        tenor: Tenor,
        amount: Amount,
    ) -> Result<Amount, LimitServiceError> {
        self.controls.decrement_count.fetch_add(1, Ordering::SeqCst);
        Self::pause(&self.controls.decrement_delay_ms).await;

        if self.controls.fail_on_decrement.load(Ordering::SeqCst) {
            return Err(LimitServiceError::Unavailable(
                "limit decrement failed".to_string(),
            ));
        }

        let mut limits = self.limits.write().unwrap_or_else(PoisonError::into_inner);
        let available = limits
            .get_mut(&(consumer_id, tenor))
            .ok_or(LimitServiceError::ConsumerLimitNotFound { consumer_id, tenor })?;

        let remaining = available.checked_sub(amount).ok_or_else(|| {
            LimitServiceError::Rejected(format!(
                "requested {amount} exceeds available {}",
                *available
            ))
        })?;
        *available = remaining;

        Ok(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_with(limit: u64) -> InMemoryLimitService {
        let service = InMemoryLimitService::new();
        service.set_limit(ConsumerId::new(1), Tenor::new(6), Amount::new(limit));
        service
    }

    #[tokio::test]
    async fn get_returns_configured_limit() {
        let service = service_with(100_000);

        let available = service
            .get_available_limit(ConsumerId::new(1), Tenor::new(6))
            .await
            .unwrap();

        assert_eq!(available, Amount::new(100_000));
        assert_eq!(service.get_count(), 1);
    }

    #[tokio::test]
    async fn limits_are_keyed_by_tenor() {
        let service = service_with(100_000);

        let result = service
            .get_available_limit(ConsumerId::new(1), Tenor::new(12))
            .await;

        assert!(matches!(
            result,
            Err(LimitServiceError::ConsumerLimitNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn decrement_reduces_available_limit() {
        let service = service_with(100_000);

        let remaining = service
            .decrement_available_limit(ConsumerId::new(1), Tenor::new(6), Amount::new(50_000))
            .await
            .unwrap();

        assert_eq!(remaining, Amount::new(50_000));
        assert_eq!(
            service.available_limit(ConsumerId::new(1), Tenor::new(6)),
            Some(Amount::new(50_000))
        );
    }

    #[tokio::test]
    async fn decrement_rejects_overdraw_without_changing_limit() {
        let service = service_with(10_000);

        let result = service
            .decrement_available_limit(ConsumerId::new(1), Tenor::new(6), Amount::new(50_000))
            .await;

        assert!(matches!(result, Err(LimitServiceError::Rejected(_))));
        assert_eq!(
            service.available_limit(ConsumerId::new(1), Tenor::new(6)),
            Some(Amount::new(10_000))
        );
        assert_eq!(service.decrement_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_decrements_never_overdraw() {
        let service = service_with(100_000);

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .decrement_available_limit(
                            ConsumerId::new(1),
                            Tenor::new(6),
                            Amount::new(30_000),
                        )
                        .await
                })
            })
            .collect();

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }

        assert_eq!(succeeded, 3);
        assert_eq!(
            service.available_limit(ConsumerId::new(1), Tenor::new(6)),
            Some(Amount::new(10_000))
        );
    }

    #[tokio::test]
    async fn injected_faults_report_unavailable() {
        let service = service_with(100_000);
        service.set_fail_on_get(true);
        service.set_fail_on_decrement(true);

        assert!(matches!(
            service
                .get_available_limit(ConsumerId::new(1), Tenor::new(6))
                .await,
            Err(LimitServiceError::Unavailable(_))
        ));
        assert!(matches!(
            service
                .decrement_available_limit(ConsumerId::new(1), Tenor::new(6), Amount::new(1))
                .await,
            Err(LimitServiceError::Unavailable(_))
        ));
        assert_eq!(
            service.available_limit(ConsumerId::new(1), Tenor::new(6)),
            Some(Amount::new(100_000))
        );
    }
}

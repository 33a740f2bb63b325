//! HTTP handlers.

pub mod system;
pub mod transactions;

use std::sync::Arc;

use saga::{LimitService, SagaCoordinator};
use serde::Serialize;
use transaction_store::TransactionStore;

/// Store behind the running server, chosen at start.
pub type DynStore = Arc<dyn TransactionStore>;

/// Limit service behind the running server, chosen at start.
pub type DynLimits = Arc<dyn LimitService>;

pub type Coordinator = SagaCoordinator<DynStore, DynLimits>;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
}

impl AppState {
    pub fn new(coordinator: Coordinator) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
        }
    }
}

/// Success payload envelope: `{code, message, data}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub code: u16,
    pub message: String,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(status: axum::http::StatusCode, message: impl Into<String>, data: T) -> Self {
        Self {
            code: status.as_u16(),
            message: message.into(),
            data,
        }
    }
}

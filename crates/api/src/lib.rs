//! HTTP API server for installment transactions.
//!
//! Exposes the transaction-creation saga and the transaction read paths over
//! REST, with token-based authorization, structured logging (tracing) and
//! Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{ExecutionMode, InMemoryLimitService, SagaCoordinator};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use transaction_store::InMemoryTransactionStore;

use auth::AuthState;
use routes::{AppState, DynLimits, DynStore};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle, auth: AuthState) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::system::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::system::health))
        .route(
            "/transactions",
            get(routes::transactions::list).post(routes::transactions::create),
        )
        .route(
            "/transactions/{id}",
            get(routes::transactions::get).delete(routes::transactions::rollback),
        )
        .route(
            "/transactions/contract/{contract_number}",
            get(routes::transactions::get_by_contract_number),
        )
        .route(
            "/consumers/{consumer_id}/transactions",
            get(routes::transactions::list_for_consumer),
        )
        .route_layer(middleware::from_fn_with_state(auth, auth::authorize))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Builds application state over the given store and limit service.
pub fn create_state(store: DynStore, limits: DynLimits, mode: ExecutionMode) -> Arc<AppState> {
    Arc::new(AppState::new(
        SagaCoordinator::new(store, limits).with_mode(mode),
    ))
}

/// Creates application state backed by in-memory store and limit service.
///
/// The concrete handles are returned as well so callers can seed limits or
/// inject faults.
pub fn create_in_memory_state(
    mode: ExecutionMode,
) -> (Arc<AppState>, InMemoryTransactionStore, InMemoryLimitService) {
    let store = InMemoryTransactionStore::new();
    let limits = InMemoryLimitService::new();
    let state = create_state(Arc::new(store.clone()), Arc::new(limits.clone()), mode);
    (state, store, limits)
}

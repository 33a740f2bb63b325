//! Transaction creation, lookup and rollback endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{ConsumerId, TransactionId};
use domain::CreateTransaction;
use saga::cancel_pair;
use serde::Deserialize;
use transaction_store::{Transaction, TransactionQuery};

use super::{AppState, Envelope};
use crate::error::ApiError;

/// Largest page a list call returns.
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub consumer_id: Option<u64>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ListParams {
    fn into_query(self) -> Result<TransactionQuery, ApiError> {
        let mut query = TransactionQuery::new()
            .limit(self.limit.unwrap_or(MAX_PAGE_SIZE).min(MAX_PAGE_SIZE));
        if let Some(consumer_id) = self.consumer_id {
            query = query.consumer_id(ConsumerId::new(consumer_id));
        }
        if let Some(offset) = self.offset {
            // Stores address rows with signed 64-bit offsets.
            if i64::try_from(offset).is_err() {
                return Err(ApiError::InvalidArgument(format!(
                    "offset out of range: {offset}"
                )));
            }
            query = query.offset(offset);
        }
        Ok(query)
    }
}

/// POST /transactions, runs the creation saga.
///
/// The saga runs on its own task. Dropping this handler (client gone)
/// cancels its remote calls through the guard, while the task itself keeps
/// going so a started compensation still finishes.
#[tracing::instrument(skip(state, payload))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateTransaction>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<Transaction>>), ApiError> {
    let Json(cmd) = payload.map_err(|e| ApiError::InvalidArgument(e.body_text()))?;

    let (handle, signal) = cancel_pair();
    let _guard = handle.drop_guard();

    let coordinator = state.coordinator.clone();
    let saga = tokio::spawn(async move { coordinator.create_transaction(cmd, signal).await });

    let transaction = saga
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "saga task failed");
            ApiError::Internal("Error while create transaction".to_string())
        })??;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::new(
            StatusCode::CREATED,
            "Success create transaction",
            transaction,
        )),
    ))
}

/// GET /transactions
#[tracing::instrument(skip(state, params))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Envelope<Vec<Transaction>>>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::InvalidArgument(e.body_text()))?;

    let transactions = state
        .coordinator
        .transactions()
        .find_all(params.into_query()?)
        .await?;

    Ok(Json(Envelope::new(
        StatusCode::OK,
        "Success get transactions",
        transactions,
    )))
}

/// GET /transactions/{id}
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Transaction>>, ApiError> {
    let id = parse_transaction_id(&id)?;
    let transaction = state.coordinator.transactions().find_by_id(id).await?;

    Ok(Json(Envelope::new(
        StatusCode::OK,
        "Success get transaction",
        transaction,
    )))
}

/// GET /transactions/contract/{contract_number}
#[tracing::instrument(skip(state))]
pub async fn get_by_contract_number(
    State(state): State<Arc<AppState>>,
    Path(contract_number): Path<String>,
) -> Result<Json<Envelope<Transaction>>, ApiError> {
    let transaction = state
        .coordinator
        .transactions()
        .find_by_contract_number(&contract_number)
        .await?;

    Ok(Json(Envelope::new(
        StatusCode::OK,
        "Success get transaction",
        transaction,
    )))
}

/// GET /consumers/{consumer_id}/transactions
#[tracing::instrument(skip(state))]
pub async fn list_for_consumer(
    State(state): State<Arc<AppState>>,
    Path(consumer_id): Path<String>,
) -> Result<Json<Envelope<Vec<Transaction>>>, ApiError> {
    let consumer_id = consumer_id
        .parse::<u64>()
        .map(ConsumerId::new)
        .map_err(|_| ApiError::InvalidArgument(format!("Invalid consumer id: {consumer_id}")))?;

    let transactions = state
        .coordinator
        .transactions()
        .find_by_consumer_id(consumer_id)
        .await?;

    Ok(Json(Envelope::new(
        StatusCode::OK,
        "Success get transactions",
        transactions,
    )))
}

/// DELETE /transactions/{id}, administrative rollback.
///
/// Deletes the local record only; the remote limit is left as is.
#[tracing::instrument(skip(state))]
pub async fn rollback(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Transaction>>, ApiError> {
    let id = parse_transaction_id(&id)?;
    let transactions = state.coordinator.transactions();

    let transaction = transactions.find_by_id(id).await?;
    transactions.rollback(id).await?;

    Ok(Json(Envelope::new(
        StatusCode::OK,
        "Success rollback transaction",
        transaction,
    )))
}

fn parse_transaction_id(raw: &str) -> Result<TransactionId, ApiError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .map(TransactionId::new)
        .ok_or_else(|| ApiError::InvalidArgument(format!("Invalid transaction id: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_transaction_id_accepts_positive_integers() {
        assert_eq!(parse_transaction_id("17").unwrap(), TransactionId::new(17));
        assert!(parse_transaction_id("0").is_err());
        assert!(parse_transaction_id("-3").is_err());
        assert!(parse_transaction_id("abc").is_err());
    }

    #[test]
    fn list_params_cap_page_size() {
        let query = ListParams {
            consumer_id: Some(4),
            limit: Some(10_000),
            offset: Some(20),
        }
        .into_query()
        .unwrap();

        assert_eq!(query.consumer_id, Some(ConsumerId::new(4)));
        assert_eq!(query.limit, Some(MAX_PAGE_SIZE));
        assert_eq!(query.offset, Some(20));
    }

    #[test]
    fn list_params_default_to_first_page() {
        let query = ListParams::default().into_query().unwrap();
        assert_eq!(query, TransactionQuery::new().limit(MAX_PAGE_SIZE));
    }

    #[test]
    fn list_params_reject_offset_beyond_signed_range() {
        let result = ListParams {
            offset: Some(usize::MAX),
            ..ListParams::default()
        }
        .into_query();

        assert!(matches!(result, Err(ApiError::InvalidArgument(_))));
    }
}

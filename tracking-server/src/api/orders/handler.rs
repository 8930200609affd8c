//! Order API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::models::{
    CreateOrderInput, OrderDetail, StatusRecord, StatusUpdateInput, VerificationVerdict,
};

use crate::core::ServerState;
use crate::db::repository::{order, status_record};
use crate::utils::{AppError, AppResult, ErrorCode};

/// Create an order
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<CreateOrderInput>,
) -> AppResult<Json<OrderDetail>> {
    let outcome = state.pipeline.create_order(payload, None).await?;
    Ok(Json(outcome.into_detail()))
}

/// Get order by id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<OrderDetail>> {
    let detail = state.pipeline.order_detail(id).await?;
    Ok(Json(detail))
}

/// Append a status record
///
/// No idempotency key: every call appends.
pub async fn add_history(
    State(state): State<ServerState>,
    Json(payload): Json<StatusUpdateInput>,
) -> AppResult<Json<StatusRecord>> {
    let outcome = state.pipeline.record_status(payload, None).await?;
    Ok(Json(outcome.into_record()))
}

/// Status history, newest first
pub async fn history(
    State(state): State<ServerState>,
    Path(order_id): Path<i64>,
) -> AppResult<Json<Vec<StatusRecord>>> {
    let records = status_record::find_by_order_desc(state.pool(), order_id).await?;
    if records.is_empty() && order::find_by_id(state.pool(), order_id).await?.is_none() {
        return Err(AppError::with_message(
            ErrorCode::OrderNotFound,
            format!("Order {} not found", order_id),
        ));
    }
    Ok(Json(records))
}

/// Reconcile the order's history with the ledger
pub async fn verify(
    State(state): State<ServerState>,
    Path(order_id): Path<i64>,
) -> AppResult<Json<VerificationVerdict>> {
    let verdict = state.verifier.verify(order_id).await?;
    Ok(Json(verdict))
}

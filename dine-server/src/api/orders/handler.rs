//! Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::core::ServerState;
use crate::orders::StatusChange;
use crate::utils::{AppError, AppJson, AppResult};
use shared::models::{CartSubmission, OrderDetail, OrderStatusUpdate, SubmitReceipt};

#[derive(Debug, Deserialize)]
pub struct SubmitQuery {
    table: Option<String>,
}

/// `?table=` as sent by the QR link; blank means absent
fn parse_table_param(raw: Option<&str>) -> AppResult<Option<i32>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse::<i32>()
            .map(Some)
            .map_err(|_| AppError::validation(format!("Invalid table number: {}", value))),
    }
}

/// POST /api/orders?table=N - submit a cart
pub async fn submit(
    State(state): State<ServerState>,
    Query(query): Query<SubmitQuery>,
    AppJson(payload): AppJson<CartSubmission>,
) -> AppResult<Json<SubmitReceipt>> {
    let table_param = parse_table_param(query.table.as_deref())?;
    Ok(Json(state.aggregator.submit(table_param, payload)?))
}

/// GET /api/orders - every order, newest first
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<OrderDetail>>> {
    Ok(Json(state.queries.list_orders()?))
}

/// GET /api/orders/paid - payments, newest first
pub async fn paid(State(state): State<ServerState>) -> AppResult<Json<Vec<OrderDetail>>> {
    Ok(Json(state.queries.paid_orders()?))
}

/// GET /api/orders/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<OrderDetail>> {
    Ok(Json(state.queries.get_order(&id)?))
}

/// PUT /api/orders/{id}/status
pub async fn set_status(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<OrderStatusUpdate>,
) -> AppResult<Json<StatusChange>> {
    Ok(Json(state.status.set_status(&id, payload.status)?))
}

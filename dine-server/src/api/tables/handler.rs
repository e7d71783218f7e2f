//! Dining Table API Handlers

use axum::{
    Json,
    extract::{Path, State},
};

use crate::core::ServerState;
use crate::utils::{AppJson, AppResult};
use shared::models::{
    DiningTable, DiningTableCreate, OrderDetail, SessionReset, TableLink, TableToggle,
};

/// GET /api/tables - all tables ordered by number
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<DiningTable>>> {
    Ok(Json(state.tables.list_tables()?))
}

/// POST /api/tables - create a table
pub async fn create(
    State(state): State<ServerState>,
    AppJson(payload): AppJson<DiningTableCreate>,
) -> AppResult<Json<DiningTable>> {
    Ok(Json(state.tables.create_table(payload)?))
}

/// GET /api/tables/{number}/status - current table row
pub async fn status(
    State(state): State<ServerState>,
    Path(number): Path<i32>,
) -> AppResult<Json<DiningTable>> {
    Ok(Json(state.tables.get_table(number)?))
}

/// GET /api/tables/{number}/link - QR link
pub async fn link(
    State(state): State<ServerState>,
    Path(number): Path<i32>,
) -> AppResult<Json<TableLink>> {
    Ok(Json(state.tables.table_link(number)?))
}

/// POST /api/tables/{number}/call-waiter
pub async fn call_waiter(
    State(state): State<ServerState>,
    Path(number): Path<i32>,
) -> AppResult<Json<DiningTable>> {
    Ok(Json(state.tables.call_waiter(number)?))
}

/// POST /api/tables/{number}/toggle - staff override
pub async fn toggle(
    State(state): State<ServerState>,
    Path(number): Path<i32>,
    AppJson(payload): AppJson<TableToggle>,
) -> AppResult<Json<DiningTable>> {
    Ok(Json(state.tables.toggle(number, payload.status)?))
}

/// POST /api/tables/{number}/resolve - waiter attended
pub async fn resolve(
    State(state): State<ServerState>,
    Path(number): Path<i32>,
) -> AppResult<Json<DiningTable>> {
    Ok(Json(state.tables.resolve_service(number)?))
}

/// POST /api/tables/{number}/reset - free the table, cancel pending orders
pub async fn reset(
    State(state): State<ServerState>,
    Path(number): Path<i32>,
) -> AppResult<Json<SessionReset>> {
    Ok(Json(state.tables.reset_session(number)?))
}

/// GET /api/tables/{number}/recent-order - the diner's open order, if any
pub async fn recent_order(
    State(state): State<ServerState>,
    Path(number): Path<i32>,
) -> AppResult<Json<Option<OrderDetail>>> {
    Ok(Json(state.queries.recent_order_for_table(number)?))
}

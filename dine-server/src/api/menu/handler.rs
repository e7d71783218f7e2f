//! Menu API Handlers

use axum::{
    Json,
    extract::{Path, State},
};

use crate::core::ServerState;
use crate::utils::{AppJson, AppResult};
use shared::models::{MenuItem, MenuItemUpsert};

/// GET /api/menu - active items
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<MenuItem>>> {
    Ok(Json(state.menu.list_active()?))
}

/// POST /api/menu - create or replace an item
pub async fn upsert(
    State(state): State<ServerState>,
    AppJson(payload): AppJson<MenuItemUpsert>,
) -> AppResult<Json<MenuItem>> {
    Ok(Json(state.menu.upsert(payload)?))
}

/// POST /api/menu/{id}/archive - soft delete
pub async fn archive(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<MenuItem>> {
    Ok(Json(state.menu.archive(&id)?))
}

/// POST /api/menu/{id}/restore
pub async fn restore(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<MenuItem>> {
    Ok(Json(state.menu.restore(&id)?))
}

/// DELETE /api/menu/{id} - hard delete; existing order lines keep their price
pub async fn hard_delete(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<bool>> {
    state.menu.hard_delete(&id)?;
    Ok(Json(true))
}

//! Dashboard statistics

use axum::{Json, Router, extract::State, middleware, routing::get};

use crate::auth::require_admin;
use crate::core::ServerState;
use crate::utils::AppResult;
use shared::models::DashboardStats;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/stats", get(dashboard))
        .layer(middleware::from_fn(require_admin))
}

/// GET /api/stats - active tables, pending orders, paid revenue
pub async fn dashboard(State(state): State<ServerState>) -> AppResult<Json<DashboardStats>> {
    Ok(Json(state.queries.stats()?))
}

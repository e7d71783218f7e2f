//! Session identity
//!
//! GET /api/auth/me returns the user id and the role as it is right now.
//! Clients call it after every sign-in or sign-out instead of caching
//! the role.

use axum::{Json, Router, routing::get};

use crate::core::ServerState;
use crate::utils::AppResult;
use shared::models::CurrentUser;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/auth/me", get(me))
}

/// GET /api/auth/me
pub async fn me(user: CurrentUser) -> AppResult<Json<CurrentUser>> {
    Ok(Json(user))
}

//! Dining Table API

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/tables", routes())
}

fn routes() -> Router<ServerState> {
    // Reached from the diner's phone without a session
    let diner_routes = Router::new()
        .route("/{number}/status", get(handler::status))
        .route("/{number}/call-waiter", post(handler::call_waiter))
        .route("/{number}/recent-order", get(handler::recent_order));

    let manage_routes = Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/{number}/link", get(handler::link))
        .route("/{number}/toggle", post(handler::toggle))
        .route("/{number}/resolve", post(handler::resolve))
        .route("/{number}/reset", post(handler::reset))
        .layer(middleware::from_fn(require_admin));

    diner_routes.merge(manage_routes)
}

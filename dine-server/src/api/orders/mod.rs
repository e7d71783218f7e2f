//! Order API

mod handler;

use axum::{
    Router, middleware,
    routing::{get, put},
};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    let manage_routes = Router::new()
        .route("/paid", get(handler::paid))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/status", put(handler::set_status))
        .layer(middleware::from_fn(require_admin));

    Router::new()
        .route(
            "/",
            get(handler::list)
                .layer(middleware::from_fn(require_admin))
                .post(handler::submit),
        )
        .merge(manage_routes)
}

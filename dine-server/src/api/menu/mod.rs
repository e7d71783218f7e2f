//! Menu API

mod handler;

use axum::{
    Router, middleware,
    routing::{delete, post},
};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/menu", routes())
}

fn routes() -> Router<ServerState> {
    let manage_routes = Router::new()
        .route("/{id}/archive", post(handler::archive))
        .route("/{id}/restore", post(handler::restore))
        .route("/{id}", delete(handler::hard_delete))
        .layer(middleware::from_fn(require_admin));

    Router::new()
        .route(
            "/",
            post(handler::upsert)
                .layer(middleware::from_fn(require_admin))
                .get(handler::list),
        )
        .merge(manage_routes)
}

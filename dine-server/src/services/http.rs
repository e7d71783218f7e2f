use crate::auth::require_auth;
use crate::core::{Result, ServerError, ServerState};
use crate::utils::AppError;
use axum::body::Body;
use axum::{Router, middleware};
use parking_lot::RwLock;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::cors::CorsLayer;

/// Access log middleware
async fn log_request(
    request: http::Request<Body>,
    next: middleware::Next,
) -> http::Response<Body> {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    tracing::info!(target: "http_access", "{} {} {}", method, uri, response.status());
    response
}

/// Build the router without state
pub fn build_app() -> Router<ServerState> {
    Router::<ServerState>::new()
        .merge(crate::api::health::router())
        .merge(crate::api::auth::router())
        .merge(crate::api::menu::router())
        .merge(crate::api::tables::router())
        .merge(crate::api::orders::router())
        .merge(crate::api::stats::router())
        .merge(crate::api::realtime::router())
}

/// Owns the finished router
///
/// The same router serves TCP connections and in-process requests.
#[derive(Clone, Default)]
pub struct HttpService {
    router: Arc<RwLock<Option<Router>>>,
}

impl std::fmt::Debug for HttpService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpService")
            .field("initialized", &self.router.read().is_some())
            .finish()
    }
}

impl HttpService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the router once the server state exists
    pub fn initialize(&self, state: ServerState) {
        let app = build_app()
            // Skips public routes internally
            .layer(middleware::from_fn_with_state(state.clone(), require_auth))
            .with_state(state)
            .layer(CorsLayer::permissive())
            .layer(middleware::from_fn(log_request));

        *self.router.write() = Some(app);
    }

    pub fn router(&self) -> Option<Router> {
        self.router.read().clone()
    }

    /// Dispatch one request without a socket
    pub async fn oneshot(
        &self,
        request: http::Request<Body>,
    ) -> std::result::Result<http::Response<Body>, AppError> {
        let router = self
            .router()
            .ok_or_else(|| AppError::internal("HttpService not initialized"))?;

        // Router's error type is Infallible
        match router.oneshot(request).await {
            Ok(response) => Ok(response),
            Err(never) => match never {},
        }
    }

    /// Serve on `listener` until `shutdown` resolves
    pub async fn serve<F>(&self, listener: tokio::net::TcpListener, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let app = self
            .router()
            .ok_or_else(|| ServerError::Config("HttpService not initialized".into()))?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}

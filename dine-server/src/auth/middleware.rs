//! Authentication middleware

use axum::{extract::Request, extract::State, middleware::Next, response::Response};
use http::{Method, header};
use shared::models::CurrentUser;

use crate::auth::extractor::resolve_user;
use crate::core::ServerState;
use crate::security_log;
use crate::utils::{AppError, ErrorCode};

/// Routes diners reach without a session
///
/// Paths are matched segment by segment, so `/api/tables/5/status` and
/// `/api/tables/12/status/` are both public.
pub fn is_public_route(method: &Method, path: &str) -> bool {
    if !path.starts_with("/api/") {
        return true;
    }
    let segments: Vec<&str> = path
        .trim_end_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    matches!(
        (method, segments.as_slice()),
        (&Method::GET, ["api", "menu"])
            | (&Method::GET, ["api", "realtime"])
            | (&Method::POST, ["api", "orders"])
            | (&Method::GET, ["api", "tables", _, "status" | "recent-order"])
            | (&Method::POST, ["api", "tables", _, "call-waiter"])
    )
}

/// Resolve the session for every non-public API route
///
/// The resolved [`CurrentUser`] is stored in the request extensions.
pub async fn require_auth(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if req.method() == Method::OPTIONS || is_public_route(req.method(), req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let user = resolve_user(&state, auth_header, req.uri().path())?;

    tracing::debug!(user_id = %user.user_id, role = ?user.role, "Session resolved");
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Staff-only guard; run after [`require_auth`]
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(AppError::not_authenticated)?;

    if !user.is_admin() {
        security_log!(
            "WARN",
            "admin_required",
            user_id = %user.user_id,
            uri = %req.uri()
        );
        return Err(AppError::new(ErrorCode::AdminRequired));
    }

    Ok(next.run(req).await)
}

/// Convenience access to the session user in handlers
pub trait CurrentUserExt {
    fn current_user(&self) -> Option<&CurrentUser>;
}

impl CurrentUserExt for Request {
    fn current_user(&self) -> Option<&CurrentUser> {
        self.extensions().get::<CurrentUser>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_routes() {
        assert!(is_public_route(&Method::GET, "/api/menu"));
        assert!(is_public_route(&Method::POST, "/api/orders"));
        assert!(is_public_route(&Method::GET, "/api/tables/5/status"));
        assert!(is_public_route(&Method::GET, "/api/tables/5/recent-order/"));
        assert!(is_public_route(&Method::POST, "/api/tables/12/call-waiter"));
        assert!(is_public_route(&Method::GET, "/api/realtime"));
        assert!(is_public_route(&Method::GET, "/health"));
    }

    #[test]
    fn test_staff_routes() {
        assert!(!is_public_route(&Method::GET, "/api/orders"));
        assert!(!is_public_route(&Method::PUT, "/api/orders/o1/status"));
        assert!(!is_public_route(&Method::POST, "/api/tables"));
        assert!(!is_public_route(&Method::PUT, "/api/tables/5/toggle"));
        assert!(!is_public_route(&Method::GET, "/api/auth/me"));
        assert!(!is_public_route(&Method::POST, "/api/menu"));
    }
}

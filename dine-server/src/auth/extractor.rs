//! Axum extractor for the session user

use axum::extract::FromRequestParts;
use http::header;
use http::request::Parts;
use shared::models::{CurrentUser, Role};

use crate::auth::JwtService;
use crate::auth::jwt::JwtError;
use crate::core::ServerState;
use crate::security_log;
use crate::utils::AppError;

impl FromRequestParts<ServerState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        // Already resolved by require_auth
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        resolve_user(state, auth_header, parts.uri.path())
    }
}

/// Validate the bearer token and load the user's role from `profiles`
///
/// A user without a profile row is a customer.
pub fn resolve_user(
    state: &ServerState,
    auth_header: Option<&str>,
    uri: &str,
) -> Result<CurrentUser, AppError> {
    let token = match auth_header.and_then(JwtService::extract_from_header) {
        Some(token) => token,
        None => {
            security_log!("WARN", "auth_missing", uri = %uri);
            return Err(AppError::not_authenticated());
        }
    };

    let claims = state.get_jwt_service().validate_token(token).map_err(|e| {
        security_log!("WARN", "auth_invalid", uri = %uri, error = %e);
        match e {
            JwtError::ExpiredToken => AppError::token_expired(),
            _ => AppError::invalid_token("Invalid token"),
        }
    })?;

    let role = state
        .storage
        .get_profile(&claims.sub)
        .map_err(AppError::from)?
        .map(|profile| profile.role)
        .unwrap_or(Role::Customer);

    Ok(CurrentUser {
        user_id: claims.sub,
        role,
    })
}

//! JSON body extractor that fails with the error envelope
//!
//! `axum::Json` answers a bad body with a plain-text rejection. Handlers
//! take [`AppJson`] instead so clients always get `{code, message}`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use shared::error::{AppError, ErrorCode};

/// `axum::Json` with [`AppError`] as the rejection
#[derive(Debug, Clone, Copy, Default)]
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejection_error(&rejection)),
        }
    }
}

fn rejection_error(rejection: &JsonRejection) -> AppError {
    let message = rejection.body_text();
    tracing::debug!(status = %rejection.status(), %message, "Rejected JSON body");

    match rejection {
        JsonRejection::JsonDataError(_) => {
            let field = failing_field(&message).map(str::to_owned);
            match field.as_deref() {
                Some("quantity") => AppError::with_message(ErrorCode::InvalidQuantity, message),
                Some("price") => AppError::with_message(ErrorCode::InvalidPrice, message),
                Some(name) => AppError::with_message(ErrorCode::ValidationFailed, message)
                    .with_detail("field", name),
                None => AppError::with_message(ErrorCode::ValidationFailed, message),
            }
        }
        _ => AppError::invalid_request(message),
    }
}

/// Last path segment of a data error, e.g. `quantity` for `items[0].quantity`
///
/// The text reads `Failed to deserialize ... target type: <path>: <reason>`.
fn failing_field(message: &str) -> Option<&str> {
    let (_, rest) = message.split_once("target type: ")?;
    let (path, _) = rest.split_once(": ")?;
    if path.contains(' ') {
        // No path: the error is about the document itself
        return None;
    }
    let segment = path.rsplit('.').next()?;
    let segment = segment.split('[').next()?;
    (!segment.is_empty()).then_some(segment)
}

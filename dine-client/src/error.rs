//! Client error types

use shared::error::{ApiResponse, AppError, ErrorCode};
use std::collections::HashMap;
use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with an error envelope
    #[error("{message} ({code})")]
    Api {
        code: ErrorCode,
        message: String,
        details: Option<HashMap<String, serde_json::Value>>,
    },

    /// Request could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Realtime channel could not be opened or was dropped
    #[error("Channel error: {0}")]
    Channel(String),

    /// Validation error raised before anything was sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Error code when the server rejected the request
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Decode a non-2xx body; falls back to the HTTP status when the body
    /// is not an envelope
    pub(crate) fn from_error_body(status: http::StatusCode, body: &[u8]) -> Self {
        match serde_json::from_slice::<ApiResponse<serde_json::Value>>(body) {
            Ok(envelope) => match envelope.into_result() {
                Err(err) => err.into(),
                Ok(_) => Self::InvalidResponse(format!("error status {} with success body", status)),
            },
            Err(_) => Self::InvalidResponse(format!(
                "{}: {}",
                status,
                String::from_utf8_lossy(body)
            )),
        }
    }
}

impl From<AppError> for ClientError {
    fn from(err: AppError) -> Self {
        Self::Api {
            code: err.code,
            message: err.message,
            details: err.details,
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_envelope() {
        let body = serde_json::to_vec(&ApiResponse::error(&AppError::new(
            ErrorCode::TableSessionExpired,
        )))
        .unwrap();
        let err = ClientError::from_error_body(http::StatusCode::GONE, &body);
        assert_eq!(err.code(), Some(ErrorCode::TableSessionExpired));
    }

    #[test]
    fn test_decode_plain_body() {
        let err = ClientError::from_error_body(http::StatusCode::BAD_GATEWAY, b"upstream down");
        assert!(matches!(err, ClientError::InvalidResponse(msg) if msg.contains("upstream down")));
    }
}

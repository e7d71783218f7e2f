use super::transition::TransitionError;
use crate::storage::StorageError;
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

/// Table session errors
#[derive(Debug, Error)]
pub enum TableError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Table {0} not found")]
    NotFound(i32),

    #[error("Table {0} session has ended, please scan the QR code again")]
    SessionExpired(i32),

    #[error("Table {0} is not accepting orders")]
    Inactive(i32),

    #[error("Table number {0} is already in use")]
    NumberTaken(i32),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Table {number}: {source}")]
    InvalidTransition {
        number: i32,
        source: TransitionError,
    },
}

pub type TableResult<T> = Result<T, TableError>;

impl TableError {
    /// Attach the table number to a transition failure
    pub(crate) fn from_transition(number: i32, err: TransitionError) -> Self {
        match err {
            TransitionError::SessionExpired => Self::SessionExpired(number),
            TransitionError::Inactive => Self::Inactive(number),
            other => Self::InvalidTransition {
                number,
                source: other,
            },
        }
    }
}

impl From<TableError> for AppError {
    fn from(err: TableError) -> Self {
        match err {
            TableError::Storage(e) => e.into(),
            TableError::NotFound(number) => {
                AppError::with_message(ErrorCode::TableNotFound, format!("Table {} not found", number))
                    .with_detail("table_number", number)
            }
            TableError::SessionExpired(number) => {
                AppError::new(ErrorCode::TableSessionExpired).with_detail("table_number", number)
            }
            TableError::Inactive(number) => {
                AppError::new(ErrorCode::TableInactive).with_detail("table_number", number)
            }
            TableError::NumberTaken(number) => AppError::with_message(
                ErrorCode::TableNumberTaken,
                format!("Table number {} is already in use", number),
            )
            .with_detail("table_number", number),
            TableError::Validation(msg) => AppError::validation(msg),
            e @ TableError::InvalidTransition { .. } => {
                AppError::with_message(ErrorCode::InvalidTableTransition, e.to_string())
            }
        }
    }
}

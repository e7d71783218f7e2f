use crate::storage::StorageError;
use crate::tables::TableError;
use shared::error::{AppError, ErrorCode};
use shared::models::OrderStatus;
use thiserror::Error;

/// Order errors
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The table half of an operation failed; nothing was committed
    #[error(transparent)]
    Table(#[from] TableError),

    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Table number is required")]
    TableNumberRequired,

    #[error("Invalid quantity {quantity} for menu item {menu_item_id}")]
    InvalidQuantity { menu_item_id: String, quantity: i32 },

    #[error("Invalid price for menu item {0}")]
    InvalidPrice(String),

    #[error("Menu item not found: {0}")]
    MenuItemNotFound(String),

    #[error("Menu item is archived: {0}")]
    MenuItemArchived(String),

    /// Re-paying would free a table that has started a new session
    #[error("Order already paid: {0}")]
    AlreadyPaid(String),

    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Validation failed: {0}")]
    Validation(String),
}

pub type OrderResult<T> = Result<T, OrderError>;

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Storage(e) => e.into(),
            OrderError::Table(e) => e.into(),
            OrderError::NotFound(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, format!("Order {} not found", id))
                    .with_detail("order_id", id)
            }
            OrderError::EmptyCart => AppError::new(ErrorCode::OrderEmpty),
            OrderError::TableNumberRequired => AppError::new(ErrorCode::TableNumberRequired),
            e @ OrderError::InvalidQuantity { .. } => {
                AppError::with_message(ErrorCode::InvalidQuantity, e.to_string())
            }
            e @ OrderError::InvalidPrice(_) => {
                AppError::with_message(ErrorCode::InvalidPrice, e.to_string())
            }
            OrderError::MenuItemNotFound(id) => AppError::with_message(
                ErrorCode::MenuItemNotFound,
                format!("Menu item {} not found", id),
            )
            .with_detail("menu_item_id", id),
            OrderError::MenuItemArchived(id) => {
                AppError::new(ErrorCode::MenuItemArchived).with_detail("menu_item_id", id)
            }
            OrderError::AlreadyPaid(id) => {
                AppError::new(ErrorCode::OrderAlreadyPaid).with_detail("order_id", id)
            }
            OrderError::InvalidTransition { from, to } => AppError::with_message(
                ErrorCode::InvalidStatusTransition,
                format!("Cannot change order status from {} to {}", from, to),
            )
            .with_detail("from", from.as_str())
            .with_detail("to", to.as_str()),
            OrderError::Validation(msg) => AppError::validation(msg),
        }
    }
}

//! Cart payloads
//!
//! A cart lives on the diner's device. It only reaches the server as a
//! [`CartSubmission`].

use super::order::Order;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// One cart line; `id` is the menu item id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CartItem {
    #[validate(length(min = 1, message = "Menu item id is required"))]
    pub id: String,
    pub name: String,
    pub price: f64,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

/// Cart submission sent by a diner
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CartSubmission {
    /// Cached table number; a `?table=` query parameter overrides it
    pub table_number: Option<i32>,
    #[validate(length(min = 1, message = "Cart is empty"), nested)]
    pub items: Vec<CartItem>,
}

/// Result of a successful submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub order: Order,
    /// True when the lines were merged into an existing pending order
    pub merged: bool,
    pub items_added: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(quantity: i32) -> CartItem {
        CartItem {
            id: "m1".into(),
            name: "Soup".into(),
            price: 5.0,
            quantity,
        }
    }

    #[test]
    fn test_submission_validation() {
        let ok = CartSubmission {
            table_number: Some(5),
            items: vec![line(2)],
        };
        assert!(ok.validate().is_ok());

        let empty = CartSubmission {
            table_number: Some(5),
            items: vec![],
        };
        assert!(empty.validate().is_err());

        let zero_qty = CartSubmission {
            table_number: Some(5),
            items: vec![line(0)],
        };
        assert!(zero_qty.validate().is_err());
    }
}

//! Cart Store
//!
//! In-memory lines of the diner's pending order. Every mutation is a
//! [`CartAction`] applied by [`CartStore::dispatch`]; the store never
//! holds a line with quantity below 1.

use rust_decimal::Decimal;
use shared::models::{CartItem, CartSubmission, MenuItem};

/// Mutations accepted by the cart
#[derive(Debug, Clone, PartialEq)]
pub enum CartAction {
    /// Same id bumps the quantity, otherwise appends with quantity 1
    Add(CartItem),
    /// Quantity below 1 removes the line
    UpdateQuantity { id: String, quantity: i32 },
    Remove(String),
    Clear,
}

/// Pending cart lines, in insertion order
#[derive(Debug, Clone, Default)]
pub struct CartStore {
    items: Vec<CartItem>,
}

impl CartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one action
    pub fn dispatch(&mut self, action: CartAction) {
        match action {
            CartAction::Add(item) => {
                match self.items.iter_mut().find(|line| line.id == item.id) {
                    Some(line) => line.quantity += 1,
                    None => self.items.push(CartItem { quantity: 1, ..item }),
                }
            }
            CartAction::UpdateQuantity { id, quantity } => {
                if quantity < 1 {
                    self.items.retain(|line| line.id != id);
                } else if let Some(line) = self.items.iter_mut().find(|line| line.id == id) {
                    line.quantity = quantity;
                }
            }
            CartAction::Remove(id) => self.items.retain(|line| line.id != id),
            CartAction::Clear => self.items.clear(),
        }
    }

    pub fn add_item(&mut self, item: CartItem) {
        self.dispatch(CartAction::Add(item));
    }

    /// Add a menu item, snapshotting its current name and price
    pub fn add_menu_item(&mut self, item: &MenuItem) {
        self.add_item(CartItem {
            id: item.id.clone(),
            name: item.name.clone(),
            price: item.price,
            quantity: 1,
        });
    }

    pub fn update_quantity(&mut self, id: impl Into<String>, quantity: i32) {
        self.dispatch(CartAction::UpdateQuantity {
            id: id.into(),
            quantity,
        });
    }

    pub fn remove_item(&mut self, id: impl Into<String>) {
        self.dispatch(CartAction::Remove(id.into()));
    }

    pub fn clear(&mut self) {
        self.dispatch(CartAction::Clear);
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of units across all lines
    pub fn item_count(&self) -> i32 {
        self.items.iter().map(|line| line.quantity).sum()
    }

    /// Σ price × quantity, rounded to cents
    pub fn total(&self) -> Decimal {
        self.items
            .iter()
            .fold(Decimal::ZERO, |acc, line| {
                acc + shared::money::line_total(line.price, line.quantity)
            })
            .round_dp(2)
    }

    /// Payload for `POST /api/orders`
    pub fn to_submission(&self, table_number: Option<i32>) -> CartSubmission {
        CartSubmission {
            table_number,
            items: self.items.clone(),
        }
    }
}

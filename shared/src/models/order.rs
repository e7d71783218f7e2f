//! Order Model

use super::dining_table::DiningTable;
use super::menu::{MenuItem, display_label};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Preparing,
    Ready,
    Completed,
    Paid,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Completed => "completed",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
        }
    }

    /// No further transitions under the strict policy
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled)
    }

    /// Still part of the table's running session
    pub fn is_open(&self) -> bool {
        !self.is_terminal()
    }

    /// Position on the kitchen pipeline (pending → completed)
    pub fn pipeline_rank(&self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Preparing => Some(1),
            Self::Ready => Some(2),
            Self::Completed => Some(3),
            Self::Paid | Self::Cancelled => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order entity
///
/// `total_amount` is always recomputed server-side from the order's items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub table_number: i32,
    pub status: OrderStatus,
    pub total_amount: f64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Order line
///
/// `unit_price` is snapshotted when the line is submitted and never
/// follows later menu price changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub menu_item_id: String,
    pub quantity: i32,
    pub unit_price: f64,
    pub created_at: i64,
}

/// Order line resolved against the menu for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemView {
    #[serde(flatten)]
    pub item: OrderItem,
    pub display_name: String,
    pub archived: bool,
}

impl OrderItemView {
    pub fn resolve(item: OrderItem, menu_item: Option<&MenuItem>) -> Self {
        Self {
            display_name: display_label(menu_item),
            archived: menu_item.is_none_or(|m| m.is_archived()),
            item,
        }
    }
}

/// Order with its lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItemView>,
}

/// Status change request
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}

/// Outcome of a status change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub order: Order,
    /// Present when the table was touched (payment)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<DiningTable>,
}

/// Admin dashboard counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub active_tables: usize,
    pub pending_orders: usize,
    pub paid_orders: usize,
    pub revenue: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> OrderItem {
        OrderItem {
            id: "i1".into(),
            order_id: "o1".into(),
            menu_item_id: "m1".into(),
            quantity: 2,
            unit_price: 4.5,
            created_at: 0,
        }
    }

    #[test]
    fn test_status_pipeline_rank() {
        assert!(OrderStatus::Pending.pipeline_rank() < OrderStatus::Preparing.pipeline_rank());
        assert!(OrderStatus::Ready.pipeline_rank() < OrderStatus::Completed.pipeline_rank());
        assert_eq!(OrderStatus::Paid.pipeline_rank(), None);
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Completed.is_terminal());
    }

    #[test]
    fn test_item_view_missing_menu_item() {
        let view = OrderItemView::resolve(item(), None);
        assert_eq!(view.display_name, "Unknown item");
        assert!(view.archived);
        assert_eq!(view.item.unit_price, 4.5);
    }

    #[test]
    fn test_item_view_flattens() {
        let view = OrderItemView::resolve(item(), None);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["quantity"], 2);
        assert_eq!(json["display_name"], "Unknown item");
    }
}

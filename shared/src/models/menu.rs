//! Menu Item Model
//!
//! Menu content is managed elsewhere; this side only reads items,
//! archives them (soft delete) and renders labels for historical order
//! lines.

use serde::{Deserialize, Serialize};

/// Label shown for order lines whose menu item was hard-deleted
pub const UNKNOWN_ITEM_LABEL: &str = "Unknown item";
/// Suffix shown for archived menu items
pub const ARCHIVED_SUFFIX: &str = "(Archived)";

/// Menu item entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub category: Option<String>,
    pub image_url: Option<String>,
    /// Soft-delete marker (UTC millis)
    pub deleted_at: Option<i64>,
    pub created_at: i64,
}

impl MenuItem {
    pub fn is_archived(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Upsert payload used for seeding the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItemUpsert {
    pub id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

/// Display label for an order line
pub fn display_label(item: Option<&MenuItem>) -> String {
    match item {
        Some(item) if item.is_archived() => format!("{} {}", item.name, ARCHIVED_SUFFIX),
        Some(item) => item.name.clone(),
        None => UNKNOWN_ITEM_LABEL.to_string(),
    }
}

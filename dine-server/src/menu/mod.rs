//! Menu catalog
//!
//! Menu content is authored elsewhere. This side lists active items,
//! archives them (soft delete through `deleted_at`), restores or hard
//! deletes them, and accepts upserts for seeding. Order lines keep their
//! own price snapshot, so none of these operations touch existing orders.

use crate::storage::{DineStorage, StorageError};
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_NOTE_LEN, MAX_URL_LEN, validate_optional_text, validate_required_text,
};
use shared::error::{AppError, ErrorCode};
use shared::models::{MenuItem, MenuItemUpsert};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MenuError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Menu item not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}

pub type MenuResult<T> = Result<T, MenuError>;

impl From<MenuError> for AppError {
    fn from(err: MenuError) -> Self {
        match err {
            MenuError::Storage(e) => e.into(),
            MenuError::NotFound(id) => AppError::with_message(
                ErrorCode::MenuItemNotFound,
                format!("Menu item {} not found", id),
            )
            .with_detail("menu_item_id", id),
            MenuError::Validation(msg) => AppError::validation(msg),
        }
    }
}

#[derive(Clone)]
pub struct MenuCatalog {
    storage: DineStorage,
}

impl std::fmt::Debug for MenuCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MenuCatalog").finish_non_exhaustive()
    }
}

impl MenuCatalog {
    pub fn new(storage: DineStorage) -> Self {
        Self { storage }
    }

    /// Items diners can order, grouped by category then name
    pub fn list_active(&self) -> MenuResult<Vec<MenuItem>> {
        let mut items: Vec<MenuItem> = self
            .storage
            .list_menu_items()?
            .into_iter()
            .filter(|m| !m.is_archived())
            .collect();
        items.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.name.cmp(&b.name)));
        Ok(items)
    }

    /// Create or replace an item; a missing id gets a fresh one
    pub fn upsert(&self, payload: MenuItemUpsert) -> MenuResult<MenuItem> {
        validate_required_text(&payload.name, "name", MAX_NAME_LEN)
            .and_then(|_| validate_optional_text(&payload.category, "category", MAX_NAME_LEN))
            .and_then(|_| validate_optional_text(&payload.description, "description", MAX_NOTE_LEN))
            .and_then(|_| validate_optional_text(&payload.image_url, "image_url", MAX_URL_LEN))
            .map_err(|e| MenuError::Validation(e.message))?;
        if !shared::money::is_valid_price(payload.price) {
            return Err(MenuError::Validation(format!(
                "price must be between 0 and {}",
                shared::money::MAX_PRICE
            )));
        }

        let txn = self.storage.begin_write()?;
        let id = payload.id.unwrap_or_else(shared::util::new_id);
        let existing = self.storage.get_menu_item_txn(&txn, &id)?;
        let item = MenuItem {
            id,
            name: payload.name.trim().to_string(),
            description: payload.description,
            price: payload.price,
            category: payload.category,
            image_url: payload.image_url,
            deleted_at: existing.as_ref().and_then(|m| m.deleted_at),
            created_at: existing
                .as_ref()
                .map(|m| m.created_at)
                .unwrap_or_else(shared::util::now_millis),
        };
        self.storage.put_menu_item(&txn, &item)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::debug!(menu_item_id = %item.id, name = %item.name, "Menu item saved");
        Ok(item)
    }

    /// Soft delete
    pub fn archive(&self, id: &str) -> MenuResult<MenuItem> {
        self.set_deleted_at(id, Some(shared::util::now_millis()))
    }

    pub fn restore(&self, id: &str) -> MenuResult<MenuItem> {
        self.set_deleted_at(id, None)
    }

    /// Remove the row; order lines referencing it fall back to a placeholder label
    pub fn hard_delete(&self, id: &str) -> MenuResult<()> {
        let txn = self.storage.begin_write()?;
        if !self.storage.remove_menu_item(&txn, id)? {
            return Err(MenuError::NotFound(id.to_string()));
        }
        txn.commit().map_err(StorageError::from)?;
        tracing::info!(menu_item_id = %id, "Menu item deleted");
        Ok(())
    }

    fn set_deleted_at(&self, id: &str, deleted_at: Option<i64>) -> MenuResult<MenuItem> {
        let txn = self.storage.begin_write()?;
        let mut item = self
            .storage
            .get_menu_item_txn(&txn, id)?
            .ok_or_else(|| MenuError::NotFound(id.to_string()))?;
        if item.deleted_at.is_some() == deleted_at.is_some() {
            return Ok(item);
        }
        item.deleted_at = deleted_at;
        self.storage.put_menu_item(&txn, &item)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(menu_item_id = %id, archived = item.is_archived(), "Menu item archive state changed");
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_catalog() -> MenuCatalog {
        MenuCatalog::new(DineStorage::open_in_memory().unwrap())
    }

    fn upsert(catalog: &MenuCatalog, id: &str, name: &str, price: f64) -> MenuItem {
        catalog
            .upsert(MenuItemUpsert {
                id: Some(id.into()),
                name: name.into(),
                description: None,
                price,
                category: Some("Mains".into()),
                image_url: None,
            })
            .unwrap()
    }

    #[test]
    fn test_archive_hides_from_menu() {
        let catalog = create_test_catalog();
        upsert(&catalog, "burger", "Burger", 10.0);
        upsert(&catalog, "fries", "Fries", 4.0);

        let archived = catalog.archive("burger").unwrap();
        assert!(archived.is_archived());

        let names: Vec<String> = catalog
            .list_active()
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["Fries".to_string()]);

        catalog.restore("burger").unwrap();
        assert_eq!(catalog.list_active().unwrap().len(), 2);
    }

    #[test]
    fn test_upsert_keeps_archive_state() {
        let catalog = create_test_catalog();
        upsert(&catalog, "burger", "Burger", 10.0);
        catalog.archive("burger").unwrap();

        let updated = upsert(&catalog, "burger", "Cheese Burger", 12.0);
        assert!(updated.is_archived());
        assert_eq!(updated.price, 12.0);
    }

    #[test]
    fn test_upsert_rejects_bad_input() {
        let catalog = create_test_catalog();
        let result = catalog.upsert(MenuItemUpsert {
            id: None,
            name: "  ".into(),
            description: None,
            price: 1.0,
            category: None,
            image_url: None,
        });
        assert!(matches!(result, Err(MenuError::Validation(_))));

        let result = catalog.upsert(MenuItemUpsert {
            id: None,
            name: "Soup".into(),
            description: None,
            price: f64::NAN,
            category: None,
            image_url: None,
        });
        assert!(matches!(result, Err(MenuError::Validation(_))));
    }

    #[test]
    fn test_hard_delete() {
        let catalog = create_test_catalog();
        upsert(&catalog, "burger", "Burger", 10.0);
        catalog.hard_delete("burger").unwrap();
        assert!(matches!(
            catalog.hard_delete("burger"),
            Err(MenuError::NotFound(_))
        ));
        assert!(matches!(catalog.archive("burger"), Err(MenuError::NotFound(_))));
    }
}

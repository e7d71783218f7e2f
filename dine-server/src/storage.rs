//! redb-based store for tables, orders and the change log
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `dining_tables` | `number` | `DiningTable` | Table rows, ordered by number |
//! | `orders` | `order_id` | `Order` | Order rows |
//! | `order_items` | `(order_id, item_id)` | `OrderItem` | Order lines |
//! | `pending_orders` | `table_number` | `order_id` | At most one pending order per table |
//! | `menu_items` | `menu_item_id` | `MenuItem` | Menu catalog (read + archive) |
//! | `profiles` | `user_id` | `Profile` | Role lookup |
//! | `change_log` | `sequence` | `ChangeEvent` | Replay source for realtime subscribers |
//! | `sequence_counter` | `"seq"` | `u64` | Global change sequence |
//!
//! # Transactions
//!
//! redb allows one writer at a time. Every manager operation runs inside a
//! single [`WriteTransaction`], so a find-or-create on `pending_orders` or a
//! dual write on an order and its table either fully commits or leaves
//! nothing behind.
//!
//! Helpers that take a `&WriteTransaction` open their table for the duration
//! of the call only; never hold a table handle across a call to another
//! helper that opens the same table.

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use shared::message::{ChangeEvent, ChangeKind, Entity};
use shared::models::{DiningTable, MenuItem, Order, OrderItem, Profile};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Table rows: key = table number, value = JSON-serialized DiningTable
const DINING_TABLES: TableDefinition<i32, &[u8]> = TableDefinition::new("dining_tables");

/// Order rows: key = order_id, value = JSON-serialized Order
const ORDERS: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Order lines: key = (order_id, item_id), value = JSON-serialized OrderItem
const ORDER_ITEMS: TableDefinition<(&str, &str), &[u8]> = TableDefinition::new("order_items");

/// Pending order per table: key = table number, value = order_id
const PENDING_ORDERS: TableDefinition<i32, &str> = TableDefinition::new("pending_orders");

/// Menu catalog: key = menu item id, value = JSON-serialized MenuItem
const MENU_ITEMS: TableDefinition<&str, &[u8]> = TableDefinition::new("menu_items");

/// Profiles: key = user id, value = JSON-serialized Profile
const PROFILES: TableDefinition<&str, &[u8]> = TableDefinition::new("profiles");

/// Change log: key = sequence, value = JSON-serialized ChangeEvent
const CHANGE_LOG: TableDefinition<u64, &[u8]> = TableDefinition::new("change_log");

/// Table for sequence counter: key = "seq", value = u64
const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

const SEQUENCE_KEY: &str = "seq";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Order not found: {0}")]
    OrderNotFound(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// JSON row image carried in a [`ChangeEvent`]
pub fn row_image<T: serde::Serialize>(row: &T) -> StorageResult<serde_json::Value> {
    Ok(serde_json::to_value(row)?)
}

impl From<StorageError> for shared::error::AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::OrderNotFound(id) => shared::error::AppError::with_message(
                shared::error::ErrorCode::OrderNotFound,
                format!("Order {} not found", id),
            ),
            other => {
                tracing::error!(error = %other, "Store operation failed");
                shared::error::AppError::database(other.to_string())
            }
        }
    }
}

/// Store backed by redb
#[derive(Clone)]
pub struct DineStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for DineStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DineStorage").finish_non_exhaustive()
    }
}

impl DineStorage {
    /// Open or create the database at the given path
    ///
    /// redb commits with `Durability::Immediate`: once `commit()` returns
    /// the write survives a crash.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::initialize(db)
    }

    /// Open an in-memory database (tests and embedded demos)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::initialize(db)
    }

    fn initialize(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            // Create all tables if they don't exist
            let _ = write_txn.open_table(DINING_TABLES)?;
            let _ = write_txn.open_table(ORDERS)?;
            let _ = write_txn.open_table(ORDER_ITEMS)?;
            let _ = write_txn.open_table(PENDING_ORDERS)?;
            let _ = write_txn.open_table(MENU_ITEMS)?;
            let _ = write_txn.open_table(PROFILES)?;
            let _ = write_txn.open_table(CHANGE_LOG)?;

            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            if seq_table.get(SEQUENCE_KEY)?.is_none() {
                seq_table.insert(SEQUENCE_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Sequence / Change Log ==========

    /// Increment and return the sequence number
    pub fn increment_sequence(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        let current = table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0);
        let next = current + 1;
        table.insert(SEQUENCE_KEY, next)?;
        Ok(next)
    }

    /// Get current sequence (read-only)
    pub fn current_sequence(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SEQUENCE_TABLE)?;
        Ok(table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    /// Record a row change inside the writing transaction
    ///
    /// The returned event must only be broadcast after `txn` commits.
    pub fn append_change(
        &self,
        txn: &WriteTransaction,
        entity: Entity,
        kind: ChangeKind,
        id: &str,
        new: Option<serde_json::Value>,
        old: Option<serde_json::Value>,
    ) -> StorageResult<ChangeEvent> {
        let sequence = self.increment_sequence(txn)?;
        let event = ChangeEvent {
            sequence,
            entity,
            kind,
            id: id.to_string(),
            new,
            old,
            timestamp: shared::util::now_millis(),
        };
        let mut table = txn.open_table(CHANGE_LOG)?;
        let value = serde_json::to_vec(&event)?;
        table.insert(sequence, value.as_slice())?;
        Ok(event)
    }

    /// Changes with `sequence > since`, oldest first, at most `limit`
    pub fn changes_since(&self, since: u64, limit: usize) -> StorageResult<Vec<ChangeEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CHANGE_LOG)?;

        let mut events = Vec::new();
        for result in table.range(since.saturating_add(1)..)?.take(limit) {
            let (_key, value) = result?;
            events.push(serde_json::from_slice(value.value())?);
        }
        Ok(events)
    }

    // ========== Dining Tables ==========

    /// Get a table by number (within transaction)
    pub fn get_table_txn(
        &self,
        txn: &WriteTransaction,
        number: i32,
    ) -> StorageResult<Option<DiningTable>> {
        let table = txn.open_table(DINING_TABLES)?;
        match table.get(number)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get a table by number (read-only)
    pub fn get_table(&self, number: i32) -> StorageResult<Option<DiningTable>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DINING_TABLES)?;
        match table.get(number)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Insert or overwrite a table row
    pub fn put_table(&self, txn: &WriteTransaction, row: &DiningTable) -> StorageResult<()> {
        let mut table = txn.open_table(DINING_TABLES)?;
        let value = serde_json::to_vec(row)?;
        table.insert(row.number, value.as_slice())?;
        Ok(())
    }

    /// All tables ordered by number
    pub fn list_tables(&self) -> StorageResult<Vec<DiningTable>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DINING_TABLES)?;

        let mut rows = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            rows.push(serde_json::from_slice(value.value())?);
        }
        Ok(rows)
    }

    // ========== Orders ==========

    /// Get an order (within transaction)
    pub fn get_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get an order (read-only)
    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Insert or overwrite an order row
    pub fn put_order(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS)?;
        let value = serde_json::to_vec(order)?;
        table.insert(order.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// All orders, unordered
    pub fn list_orders(&self) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS)?;

        let mut orders = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            orders.push(serde_json::from_slice(value.value())?);
        }
        Ok(orders)
    }

    /// Orders of one table (within transaction)
    pub fn orders_for_table_txn(
        &self,
        txn: &WriteTransaction,
        table_number: i32,
    ) -> StorageResult<Vec<Order>> {
        let table = txn.open_table(ORDERS)?;

        let mut orders = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let order: Order = serde_json::from_slice(value.value())?;
            if order.table_number == table_number {
                orders.push(order);
            }
        }
        Ok(orders)
    }

    /// Store an order line
    pub fn put_order_item(&self, txn: &WriteTransaction, item: &OrderItem) -> StorageResult<()> {
        let mut table = txn.open_table(ORDER_ITEMS)?;
        let value = serde_json::to_vec(item)?;
        table.insert((item.order_id.as_str(), item.id.as_str()), value.as_slice())?;
        Ok(())
    }

    /// Lines of one order (within transaction), oldest first
    pub fn items_for_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Vec<OrderItem>> {
        let table = txn.open_table(ORDER_ITEMS)?;
        let mut items = Vec::new();
        for result in table.range((order_id, "")..)? {
            let (key, value) = result?;
            if key.value().0 != order_id {
                break;
            }
            items.push(serde_json::from_slice::<OrderItem>(value.value())?);
        }
        items.sort_by_key(|i| i.created_at);
        Ok(items)
    }

    /// Lines of one order (read-only), oldest first
    pub fn items_for_order(&self, order_id: &str) -> StorageResult<Vec<OrderItem>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDER_ITEMS)?;
        let mut items = Vec::new();
        for result in table.range((order_id, "")..)? {
            let (key, value) = result?;
            if key.value().0 != order_id {
                break;
            }
            items.push(serde_json::from_slice::<OrderItem>(value.value())?);
        }
        items.sort_by_key(|i| i.created_at);
        Ok(items)
    }

    /// Recompute `total_amount` over the order's lines and persist it
    ///
    /// Returns the updated row.
    pub fn update_order_total(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Order> {
        let mut order = self
            .get_order_txn(txn, order_id)?
            .ok_or_else(|| StorageError::OrderNotFound(order_id.to_string()))?;
        let items = self.items_for_order_txn(txn, order_id)?;
        order.total_amount =
            shared::money::sum_lines(items.iter().map(|i| (i.unit_price, i.quantity)));
        order.updated_at = shared::util::now_millis();
        self.put_order(txn, &order)?;
        Ok(order)
    }

    // ========== Pending Order Index ==========

    /// The table's pending order id (within transaction)
    pub fn pending_order_txn(
        &self,
        txn: &WriteTransaction,
        table_number: i32,
    ) -> StorageResult<Option<String>> {
        let table = txn.open_table(PENDING_ORDERS)?;
        Ok(table.get(table_number)?.map(|guard| guard.value().to_string()))
    }

    pub fn set_pending_order(
        &self,
        txn: &WriteTransaction,
        table_number: i32,
        order_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PENDING_ORDERS)?;
        table.insert(table_number, order_id)?;
        Ok(())
    }

    /// Drop the index entry if it still points at `order_id`
    pub fn clear_pending_order(
        &self,
        txn: &WriteTransaction,
        table_number: i32,
        order_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PENDING_ORDERS)?;
        let matches = table
            .get(table_number)?
            .is_some_and(|guard| guard.value() == order_id);
        if matches {
            table.remove(table_number)?;
        }
        Ok(())
    }

    // ========== Menu Items ==========

    /// Get a menu item (within transaction)
    pub fn get_menu_item_txn(
        &self,
        txn: &WriteTransaction,
        id: &str,
    ) -> StorageResult<Option<MenuItem>> {
        let table = txn.open_table(MENU_ITEMS)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn put_menu_item(&self, txn: &WriteTransaction, item: &MenuItem) -> StorageResult<()> {
        let mut table = txn.open_table(MENU_ITEMS)?;
        let value = serde_json::to_vec(item)?;
        table.insert(item.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Remove a menu item; returns whether it existed
    pub fn remove_menu_item(&self, txn: &WriteTransaction, id: &str) -> StorageResult<bool> {
        let mut table = txn.open_table(MENU_ITEMS)?;
        Ok(table.remove(id)?.is_some())
    }

    /// All menu items, archived included
    pub fn list_menu_items(&self) -> StorageResult<Vec<MenuItem>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MENU_ITEMS)?;

        let mut items = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            items.push(serde_json::from_slice(value.value())?);
        }
        Ok(items)
    }

    // ========== Profiles ==========

    pub fn get_profile(&self, user_id: &str) -> StorageResult<Option<Profile>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROFILES)?;
        match table.get(user_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn put_profile(&self, profile: &Profile) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PROFILES)?;
            let value = serde_json::to_vec(profile)?;
            table.insert(profile.id.as_str(), value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    // ========== Statistics ==========

    /// Get storage statistics
    pub fn get_stats(&self) -> StorageResult<StorageStats> {
        let read_txn = self.db.begin_read()?;

        let tables = read_txn.open_table(DINING_TABLES)?;
        let orders = read_txn.open_table(ORDERS)?;
        let items = read_txn.open_table(ORDER_ITEMS)?;
        let pending = read_txn.open_table(PENDING_ORDERS)?;
        let changes = read_txn.open_table(CHANGE_LOG)?;
        let seq_table = read_txn.open_table(SEQUENCE_TABLE)?;

        Ok(StorageStats {
            table_count: tables.len()?,
            order_count: orders.len()?,
            order_item_count: items.len()?,
            pending_order_count: pending.len()?,
            change_count: changes.len()?,
            current_sequence: seq_table
                .get(SEQUENCE_KEY)?
                .map(|guard| guard.value())
                .unwrap_or(0),
        })
    }
}

/// Storage statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct StorageStats {
    pub table_count: u64,
    pub order_count: u64,
    pub order_item_count: u64,
    pub pending_order_count: u64,
    pub change_count: u64,
    pub current_sequence: u64,
}

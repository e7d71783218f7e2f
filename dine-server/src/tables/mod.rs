//! Table Session Manager
//!
//! Sole writer of `DiningTable.status`. Diner actions (submission, waiter
//! call) and staff actions (payment, toggle, resolve, reset) all end up in
//! [`apply_trigger`], which runs inside the caller's write transaction so
//! the table update commits together with whatever caused it.
//!
//! # Flow
//!
//! ```text
//! operation(number)
//!     ├─ 1. Begin write transaction
//!     ├─ 2. Load table row (NotFound if absent)
//!     ├─ 3. next_status(current, trigger)
//!     ├─ 4. Write row + change_log entry (skipped when unchanged)
//!     ├─ 5. Commit
//!     └─ 6. Publish change
//! ```

mod error;
mod transition;

pub use error::{TableError, TableResult};
pub use transition::{TableTrigger, TransitionError, next_status};

use crate::realtime::ChangeFeed;
use crate::storage::{DineStorage, row_image};
use crate::utils::validation::describe_errors;
use redb::WriteTransaction;
use shared::message::{ChangeEvent, ChangeKind, Entity};
use shared::models::{DiningTable, DiningTableCreate, SessionReset, TableLink, TableStatus};
use validator::Validate;

/// Result of applying a trigger inside a transaction
#[derive(Debug, Clone)]
pub struct TableTransition {
    pub table: DiningTable,
    /// `None` when the status did not change
    pub change: Option<ChangeEvent>,
}

/// Apply `trigger` to table `number` within `txn`
///
/// Re-applying the current status writes nothing and records no change.
pub fn apply_trigger(
    storage: &DineStorage,
    txn: &WriteTransaction,
    number: i32,
    trigger: TableTrigger,
) -> TableResult<TableTransition> {
    let current = storage
        .get_table_txn(txn, number)?
        .ok_or(TableError::NotFound(number))?;

    let status =
        next_status(current.status, trigger).map_err(|e| TableError::from_transition(number, e))?;

    if status == current.status {
        return Ok(TableTransition {
            table: current,
            change: None,
        });
    }

    let mut updated = current.clone();
    updated.status = status;
    updated.updated_at = shared::util::now_millis();
    storage.put_table(txn, &updated)?;

    let change = storage.append_change(
        txn,
        Entity::Tables,
        ChangeKind::Update,
        &number.to_string(),
        Some(row_image(&updated)?),
        Some(row_image(&current)?),
    )?;

    tracing::info!(
        table_number = number,
        from = %current.status,
        to = %status,
        trigger = %trigger,
        "Table status changed"
    );

    Ok(TableTransition {
        table: updated,
        change: Some(change),
    })
}

/// Table session operations
#[derive(Clone)]
pub struct TableSessionManager {
    storage: DineStorage,
    feed: ChangeFeed,
    public_base_url: String,
}

impl std::fmt::Debug for TableSessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableSessionManager")
            .field("storage", &"<DineStorage>")
            .field("public_base_url", &self.public_base_url)
            .finish()
    }
}

impl TableSessionManager {
    pub fn new(storage: DineStorage, feed: ChangeFeed, public_base_url: impl Into<String>) -> Self {
        Self {
            storage,
            feed,
            public_base_url: public_base_url.into(),
        }
    }

    /// Create a table; numbers are unique and immutable
    pub fn create_table(&self, payload: DiningTableCreate) -> TableResult<DiningTable> {
        payload
            .validate()
            .map_err(|e| TableError::Validation(describe_errors(&e)))?;

        let txn = self.storage.begin_write()?;
        if self.storage.get_table_txn(&txn, payload.number)?.is_some() {
            return Err(TableError::NumberTaken(payload.number));
        }

        let now = shared::util::now_millis();
        let table = DiningTable {
            id: shared::util::new_id(),
            number: payload.number,
            name: payload.name.filter(|n| !n.trim().is_empty()),
            status: TableStatus::Available,
            created_at: now,
            updated_at: now,
        };
        self.storage.put_table(&txn, &table)?;
        let change = self.storage.append_change(
            &txn,
            Entity::Tables,
            ChangeKind::Insert,
            &table.number.to_string(),
            Some(row_image(&table)?),
            None,
        )?;
        txn.commit().map_err(crate::storage::StorageError::from)?;

        tracing::info!(table_number = table.number, table_id = %table.id, "Table created");
        self.feed.publish(vec![change]);
        Ok(table)
    }

    /// All tables ordered by number
    pub fn list_tables(&self) -> TableResult<Vec<DiningTable>> {
        Ok(self.storage.list_tables()?)
    }

    pub fn get_table(&self, number: i32) -> TableResult<DiningTable> {
        self.storage
            .get_table(number)?
            .ok_or(TableError::NotFound(number))
    }

    /// Diner asks for a waiter: any → needs_service
    pub fn call_waiter(&self, number: i32) -> TableResult<DiningTable> {
        self.transition(number, TableTrigger::WaiterCalled)
    }

    /// Staff override of the table status
    pub fn toggle(&self, number: i32, status: TableStatus) -> TableResult<DiningTable> {
        self.transition(number, TableTrigger::ManualToggle(status))
    }

    /// Staff attended the waiter call: needs_service → occupied
    pub fn resolve_service(&self, number: i32) -> TableResult<DiningTable> {
        self.transition(number, TableTrigger::ServiceResolved)
    }

    /// Free the table and cancel whatever is still pending on it
    pub fn reset_session(&self, number: i32) -> TableResult<SessionReset> {
        let txn = self.storage.begin_write()?;
        let transition = apply_trigger(&self.storage, &txn, number, TableTrigger::SessionReset)?;
        let (cancelled_orders, mut changes) =
            crate::orders::cancel_pending_orders(&self.storage, &txn, number)?;
        txn.commit().map_err(crate::storage::StorageError::from)?;

        if let Some(change) = transition.change {
            changes.insert(0, change);
        }
        changes.sort_by_key(|c| c.sequence);

        tracing::info!(
            table_number = number,
            cancelled = cancelled_orders.len(),
            "Table session reset"
        );
        self.feed.publish(changes);

        Ok(SessionReset {
            table: transition.table,
            cancelled_orders,
        })
    }

    /// Link encoded into the table's QR code
    pub fn table_link(&self, number: i32) -> TableResult<TableLink> {
        let table = self.get_table(number)?;
        Ok(TableLink {
            number: table.number,
            url: format!(
                "{}/menu?table={}",
                self.public_base_url.trim_end_matches('/'),
                table.number
            ),
        })
    }

    fn transition(&self, number: i32, trigger: TableTrigger) -> TableResult<DiningTable> {
        let txn = self.storage.begin_write()?;
        let transition = apply_trigger(&self.storage, &txn, number, trigger)?;
        txn.commit().map_err(crate::storage::StorageError::from)?;

        if let Some(change) = transition.change {
            self.feed.publish(vec![change]);
        }
        Ok(transition.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::message::AdminAlert;

    fn create_test_manager() -> TableSessionManager {
        let storage = DineStorage::open_in_memory().unwrap();
        TableSessionManager::new(storage, ChangeFeed::new(64), "http://localhost:5173/")
    }

    fn create_table(manager: &TableSessionManager, number: i32) -> DiningTable {
        manager
            .create_table(DiningTableCreate { number, name: None })
            .unwrap()
    }

    // ========================================================================
    // Create / read
    // ========================================================================

    #[test]
    fn test_create_table() {
        let manager = create_test_manager();
        let table = create_table(&manager, 5);
        assert_eq!(table.status, TableStatus::Available);
        assert_eq!(manager.get_table(5).unwrap().id, table.id);
    }

    #[test]
    fn test_create_duplicate_number() {
        let manager = create_test_manager();
        create_table(&manager, 5);
        let result = manager.create_table(DiningTableCreate {
            number: 5,
            name: Some("Patio".into()),
        });
        assert!(matches!(result, Err(TableError::NumberTaken(5))));
    }

    #[test]
    fn test_create_invalid_number() {
        let manager = create_test_manager();
        let result = manager.create_table(DiningTableCreate {
            number: 0,
            name: None,
        });
        assert!(matches!(result, Err(TableError::Validation(_))));
    }

    #[test]
    fn test_get_missing_table() {
        let manager = create_test_manager();
        assert!(matches!(manager.get_table(9), Err(TableError::NotFound(9))));
    }

    #[test]
    fn test_table_link() {
        let manager = create_test_manager();
        create_table(&manager, 12);
        let link = manager.table_link(12).unwrap();
        assert_eq!(link.url, "http://localhost:5173/menu?table=12");
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    #[tokio::test]
    async fn test_call_waiter_publishes_alertable_change() {
        let manager = create_test_manager();
        create_table(&manager, 3);
        manager.toggle(3, TableStatus::Occupied).unwrap();

        let mut rx = manager.feed.subscribe();
        let table = manager.call_waiter(3).unwrap();
        assert_eq!(table.status, TableStatus::NeedsService);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.entity, Entity::Tables);
        assert_eq!(event.kind, ChangeKind::Update);
        assert_eq!(
            AdminAlert::classify(&event),
            Some(AdminAlert::WaiterNeeded { table_number: 3 })
        );
    }

    #[test]
    fn test_same_status_is_noop() {
        let manager = create_test_manager();
        create_table(&manager, 3);
        let before = manager.storage.current_sequence().unwrap();

        manager.toggle(3, TableStatus::Available).unwrap();
        assert_eq!(manager.storage.current_sequence().unwrap(), before);
    }

    #[test]
    fn test_resolve_service() {
        let manager = create_test_manager();
        create_table(&manager, 3);
        manager.call_waiter(3).unwrap();
        assert_eq!(
            manager.resolve_service(3).unwrap().status,
            TableStatus::Occupied
        );

        manager.toggle(3, TableStatus::Available).unwrap();
        assert!(matches!(
            manager.resolve_service(3),
            Err(TableError::InvalidTransition { number: 3, .. })
        ));
    }

    #[test]
    fn test_paid_table_toggled_back_to_available() {
        let manager = create_test_manager();
        create_table(&manager, 8);
        manager.toggle(8, TableStatus::Paid).unwrap();
        assert_eq!(
            manager.toggle(8, TableStatus::Available).unwrap().status,
            TableStatus::Available
        );
    }

    #[test]
    fn test_reset_session_without_orders() {
        let manager = create_test_manager();
        create_table(&manager, 2);
        manager.call_waiter(2).unwrap();

        let reset = manager.reset_session(2).unwrap();
        assert_eq!(reset.table.status, TableStatus::Available);
        assert!(reset.cancelled_orders.is_empty());
    }
}

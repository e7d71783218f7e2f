//! Order Aggregator
//!
//! Merges a diner's cart into the table's open order.
//!
//! # Submission Flow
//!
//! ```text
//! submit(table?, cart)
//!     ├─ 1. Resolve table number (query parameter beats cached value)
//!     ├─ 2. Validate lines (quantity, price, menu item)
//!     ├─ 3. Begin write transaction
//!     ├─ 4. Table → occupied (NotFound / SessionExpired / Inactive abort)
//!     ├─ 5. Find the table's pending order, or create one seeded with the cart total
//!     ├─ 6. Insert one line per cart item, unit price snapshotted
//!     ├─ 7. On merge, recompute total_amount over every line
//!     ├─ 8. Commit
//!     └─ 9. Publish changes
//! ```
//!
//! redb admits a single writer, so two carts racing for the same table are
//! serialized at step 3 and the second one always finds the first's order.

use super::error::{OrderError, OrderResult};
use crate::realtime::ChangeFeed;
use crate::storage::{DineStorage, StorageError, row_image};
use crate::tables::{TableTrigger, apply_trigger};
use crate::utils::validation::describe_errors;
use redb::WriteTransaction;
use shared::message::{ChangeEvent, ChangeKind, Entity};
use shared::models::{CartItem, CartSubmission, Order, OrderItem, OrderStatus, SubmitReceipt};
use shared::money::{self, MAX_QUANTITY};
use validator::Validate;

/// Cart submission handling
#[derive(Clone)]
pub struct OrderAggregator {
    storage: DineStorage,
    feed: ChangeFeed,
}

impl std::fmt::Debug for OrderAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderAggregator")
            .field("storage", &"<DineStorage>")
            .finish()
    }
}

impl OrderAggregator {
    pub fn new(storage: DineStorage, feed: ChangeFeed) -> Self {
        Self { storage, feed }
    }

    /// Submit a cart for a table
    ///
    /// `table_param` is the `?table=` value of the request; it takes
    /// precedence over the number cached in the submission.
    pub fn submit(
        &self,
        table_param: Option<i32>,
        submission: CartSubmission,
    ) -> OrderResult<SubmitReceipt> {
        let table_number = resolve_table_number(table_param, submission.table_number)?;
        validate_lines(&submission)?;

        let txn = self.storage.begin_write()?;
        let mut changes = Vec::new();

        let transition = apply_trigger(
            &self.storage,
            &txn,
            table_number,
            TableTrigger::OrderSubmitted,
        )?;
        changes.extend(transition.change);

        self.check_menu_items(&txn, &submission.items)?;

        let cart_total = money::sum_lines(submission.items.iter().map(|i| (i.price, i.quantity)));
        let now = shared::util::now_millis();

        let (order, merged) = match self.find_pending(&txn, table_number)? {
            Some(order) => (order, true),
            None => {
                let order = Order {
                    id: shared::util::new_id(),
                    table_number,
                    status: OrderStatus::Pending,
                    total_amount: cart_total,
                    created_at: now,
                    updated_at: now,
                };
                self.storage.put_order(&txn, &order)?;
                self.storage
                    .set_pending_order(&txn, table_number, &order.id)?;
                changes.push(self.storage.append_change(
                    &txn,
                    Entity::Orders,
                    ChangeKind::Insert,
                    &order.id,
                    Some(row_image(&order)?),
                    None,
                )?);
                (order, false)
            }
        };

        for line in &submission.items {
            let item = OrderItem {
                id: shared::util::new_id(),
                order_id: order.id.clone(),
                menu_item_id: line.id.clone(),
                quantity: line.quantity,
                unit_price: line.price,
                created_at: now,
            };
            self.storage.put_order_item(&txn, &item)?;
            changes.push(self.storage.append_change(
                &txn,
                Entity::OrderItems,
                ChangeKind::Insert,
                &item.id,
                Some(row_image(&item)?),
                None,
            )?);
        }

        let order = if merged {
            let updated = self.storage.update_order_total(&txn, &order.id)?;
            changes.push(self.storage.append_change(
                &txn,
                Entity::Orders,
                ChangeKind::Update,
                &order.id,
                Some(row_image(&updated)?),
                Some(row_image(&order)?),
            )?);
            updated
        } else {
            order
        };

        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            table_number,
            order_id = %order.id,
            merged,
            items = submission.items.len(),
            total = order.total_amount,
            "Cart submitted"
        );
        self.feed.publish(changes);

        Ok(SubmitReceipt {
            order,
            merged,
            items_added: submission.items.len(),
        })
    }

    /// The table's pending order, ignoring a stale index entry
    fn find_pending(&self, txn: &WriteTransaction, table_number: i32) -> OrderResult<Option<Order>> {
        let Some(order_id) = self.storage.pending_order_txn(txn, table_number)? else {
            return Ok(None);
        };
        match self.storage.get_order_txn(txn, &order_id)? {
            Some(order) if order.status == OrderStatus::Pending => Ok(Some(order)),
            _ => {
                tracing::warn!(table_number, order_id = %order_id, "Dropping stale pending order index");
                self.storage
                    .clear_pending_order(txn, table_number, &order_id)?;
                Ok(None)
            }
        }
    }

    fn check_menu_items(&self, txn: &WriteTransaction, lines: &[CartItem]) -> OrderResult<()> {
        for line in lines {
            match self.storage.get_menu_item_txn(txn, &line.id)? {
                None => return Err(OrderError::MenuItemNotFound(line.id.clone())),
                Some(item) if item.is_archived() => {
                    return Err(OrderError::MenuItemArchived(line.id.clone()));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// Explicit request parameter beats the cached value
fn resolve_table_number(param: Option<i32>, cached: Option<i32>) -> OrderResult<i32> {
    match param.or(cached) {
        Some(number) if number >= 1 => Ok(number),
        _ => Err(OrderError::TableNumberRequired),
    }
}

fn validate_lines(submission: &CartSubmission) -> OrderResult<()> {
    if submission.items.is_empty() {
        return Err(OrderError::EmptyCart);
    }
    for line in &submission.items {
        if !(1..=MAX_QUANTITY).contains(&line.quantity) {
            return Err(OrderError::InvalidQuantity {
                menu_item_id: line.id.clone(),
                quantity: line.quantity,
            });
        }
        if !money::is_valid_price(line.price) {
            return Err(OrderError::InvalidPrice(line.id.clone()));
        }
    }
    submission
        .validate()
        .map_err(|e| OrderError::Validation(describe_errors(&e)))
}

/// Cancel every pending order of a table within `txn`
///
/// Returns the cancelled order ids and their change events.
pub fn cancel_pending_orders(
    storage: &DineStorage,
    txn: &WriteTransaction,
    table_number: i32,
) -> Result<(Vec<String>, Vec<ChangeEvent>), StorageError> {
    let mut cancelled = Vec::new();
    let mut changes = Vec::new();

    for order in storage.orders_for_table_txn(txn, table_number)? {
        if order.status != OrderStatus::Pending {
            continue;
        }
        let mut updated = order.clone();
        updated.status = OrderStatus::Cancelled;
        updated.updated_at = shared::util::now_millis();
        storage.put_order(txn, &updated)?;
        storage.clear_pending_order(txn, table_number, &order.id)?;
        changes.push(storage.append_change(
            txn,
            Entity::Orders,
            ChangeKind::Update,
            &order.id,
            Some(row_image(&updated)?),
            Some(row_image(&order)?),
        )?);
        cancelled.push(order.id);
    }

    Ok((cancelled, changes))
}

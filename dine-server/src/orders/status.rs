//! Order Status Machine
//!
//! ```text
//! pending → preparing → ready → completed
//!    │          │          │         │
//!    │          └──────────┴─────────┴──► paid
//!    ├──────────────────────────────────► paid
//!    └──────────────────────────────────► cancelled
//! ```
//!
//! Setting `paid` also frees the order's table. Both rows are written in
//! the same transaction: either both change or neither does.

use super::error::{OrderError, OrderResult};
use crate::realtime::ChangeFeed;
use crate::storage::{DineStorage, StorageError, row_image};
use crate::tables::{TableTrigger, apply_trigger};
use serde::{Deserialize, Serialize};
use shared::message::{ChangeKind, Entity};
use shared::models::{Order, OrderStatus, StatusChange};
use std::fmt;
use std::str::FromStr;

/// How strictly status changes are checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusPolicy {
    /// Forward along the pipeline only; terminal states are final
    #[default]
    Strict,
    /// Any status may follow any other
    Permissive,
}

impl fmt::Display for StatusPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => f.write_str("strict"),
            Self::Permissive => f.write_str("permissive"),
        }
    }
}

impl FromStr for StatusPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "permissive" => Ok(Self::Permissive),
            other => Err(format!("unknown order status policy: {}", other)),
        }
    }
}

impl StatusPolicy {
    /// Whether `from → to` may be persisted
    pub fn allows(&self, from: OrderStatus, to: OrderStatus) -> bool {
        if from == to {
            return true;
        }
        match self {
            Self::Permissive => true,
            Self::Strict => {
                if from.is_terminal() {
                    return false;
                }
                match to {
                    OrderStatus::Paid => true,
                    OrderStatus::Cancelled => from == OrderStatus::Pending,
                    _ => match (from.pipeline_rank(), to.pipeline_rank()) {
                        (Some(a), Some(b)) => b > a,
                        _ => false,
                    },
                }
            }
        }
    }
}

/// Applies order status transitions and their side effects
#[derive(Clone)]
pub struct OrderStatusMachine {
    storage: DineStorage,
    feed: ChangeFeed,
    policy: StatusPolicy,
}

impl std::fmt::Debug for OrderStatusMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderStatusMachine")
            .field("storage", &"<DineStorage>")
            .field("policy", &self.policy)
            .finish()
    }
}

impl OrderStatusMachine {
    pub fn new(storage: DineStorage, feed: ChangeFeed, policy: StatusPolicy) -> Self {
        Self {
            storage,
            feed,
            policy,
        }
    }

    pub fn policy(&self) -> StatusPolicy {
        self.policy
    }

    /// Persist `status` for the order
    ///
    /// Re-applying the current status writes nothing, except for `paid`,
    /// which re-frees the table unless another order of that table is
    /// still open (`AlreadyPaid`).
    pub fn set_status(&self, order_id: &str, status: OrderStatus) -> OrderResult<StatusChange> {
        let txn = self.storage.begin_write()?;
        let current = self
            .storage
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))?;

        if !self.policy.allows(current.status, status) {
            return Err(OrderError::InvalidTransition {
                from: current.status,
                to: status,
            });
        }

        if current.status == OrderStatus::Paid && status == OrderStatus::Paid {
            let reopened = self
                .storage
                .orders_for_table_txn(&txn, current.table_number)?
                .iter()
                .any(|o| o.id != current.id && o.status.is_open());
            if reopened {
                return Err(OrderError::AlreadyPaid(current.id));
            }
        }

        let mut changes = Vec::new();
        let mut order = current.clone();

        if current.status != status {
            order.status = status;
            order.updated_at = shared::util::now_millis();
            self.update_pending_index(&txn, &current, status)?;
            self.storage.put_order(&txn, &order)?;
            changes.push(self.storage.append_change(
                &txn,
                Entity::Orders,
                ChangeKind::Update,
                &order.id,
                Some(row_image(&order)?),
                Some(row_image(&current)?),
            )?);
        }

        let table = if status == OrderStatus::Paid {
            let transition = apply_trigger(
                &self.storage,
                &txn,
                order.table_number,
                TableTrigger::OrderPaid,
            )?;
            changes.extend(transition.change);
            Some(transition.table)
        } else {
            None
        };

        if changes.is_empty() {
            return Ok(StatusChange { order, table });
        }

        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            order_id = %order.id,
            table_number = order.table_number,
            from = %current.status,
            to = %status,
            "Order status changed"
        );
        self.feed.publish(changes);

        Ok(StatusChange { order, table })
    }

    /// Keep `pending_orders` pointing at the table's single pending order
    fn update_pending_index(
        &self,
        txn: &redb::WriteTransaction,
        current: &Order,
        status: OrderStatus,
    ) -> OrderResult<()> {
        if current.status == OrderStatus::Pending {
            self.storage
                .clear_pending_order(txn, current.table_number, &current.id)?;
        }
        if status == OrderStatus::Pending {
            // Only reachable under the permissive policy
            if let Some(other) = self.storage.pending_order_txn(txn, current.table_number)?
                && other != current.id
            {
                tracing::warn!(
                    order_id = %current.id,
                    pending = %other,
                    "Table already has a pending order"
                );
                return Err(OrderError::InvalidTransition {
                    from: current.status,
                    to: status,
                });
            }
            self.storage
                .set_pending_order(txn, current.table_number, &current.id)?;
        }
        Ok(())
    }
}

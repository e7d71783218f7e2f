//! Diner session watcher
//!
//! ```text
//! tables  (number=eq.N) ──┐
//! orders  (table_number=eq.N) ──┼──► Invalidate ──► refetch ──► SessionView (watch)
//! poll ticker ────────────┘                               └──► SessionEnd (mpsc)
//! ```
//!
//! Push and poll only say "something changed". The consumer drains the
//! queue, refetches table status and the recent order, and derives the
//! view from what the server returned. The one thing taken from a payload
//! is the id of an order that reached `paid` or `cancelled`, since the
//! diner view cannot read closed orders back.
//!
//! A session ends when the table turns `paid`, when the table is released
//! to `available` while an order was tracked, or when the tracked order
//! itself closes. A newer order taking the tracked one's place in the
//! view is not an end.

use crate::backend::DineBackend;
use crate::config::ClientConfig;
use crate::subscription::{SubscriptionEvent, spawn_subscription};
use shared::message::{ChangeEvent, ChangeFilter, Entity, RowPredicate};
use shared::models::{DiningTable, OrderDetail, OrderStatus, TableStatus};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Why the consumer should refetch
#[derive(Debug, Clone, PartialEq, Eq)]
enum Invalidate {
    Push { closed: Option<String> },
    Poll,
}

/// What the diner sees for their table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionView {
    pub table: Option<DiningTable>,
    /// Newest order that is neither paid nor cancelled
    pub order: Option<OrderDetail>,
    /// Number of completed refreshes
    pub revision: u64,
}

/// The diner's session is over; the QR code has to be scanned again
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Table status became `paid`
    TablePaid { table_number: i32 },
    /// The tracked order was paid or cancelled, or the table was released
    /// while it was tracked
    OrderClosed { order_id: String },
}

/// Handle to a running watcher; dropping it stops the tasks
#[derive(Debug)]
pub struct SessionWatcher {
    table_number: i32,
    view: watch::Receiver<SessionView>,
    ended: mpsc::Receiver<SessionEnd>,
    shutdown: CancellationToken,
}

impl SessionWatcher {
    pub fn spawn(backend: Arc<dyn DineBackend>, table_number: i32, config: &ClientConfig) -> Self {
        let shutdown = CancellationToken::new();
        let (invalidate_tx, invalidate_rx) = mpsc::channel(config.channel_capacity);
        let (view_tx, view_rx) = watch::channel(SessionView::default());
        let (ended_tx, ended_rx) = mpsc::channel(8);

        let filters = [
            ChangeFilter::entity(Entity::Tables)
                .with_predicate(RowPredicate::eq("number", table_number.to_string())),
            ChangeFilter::entity(Entity::Orders)
                .with_predicate(RowPredicate::eq("table_number", table_number.to_string())),
        ];
        for filter in filters {
            let mut events = spawn_subscription(
                backend.clone(),
                filter,
                None,
                config.backoff,
                config.channel_capacity,
                shutdown.clone(),
            );
            let tx = invalidate_tx.clone();
            tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    let closed = match &event {
                        SubscriptionEvent::Change(change) => closed_order(change),
                        _ => None,
                    };
                    if closed.is_some() {
                        if tx.send(Invalidate::Push { closed }).await.is_err() {
                            break;
                        }
                        continue;
                    }
                    // A full queue already holds a pending refetch
                    if let Err(mpsc::error::TrySendError::Closed(_)) =
                        tx.try_send(Invalidate::Push { closed: None })
                    {
                        break;
                    }
                }
            });
        }

        let poll_interval = config.poll_interval;
        let poll_shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            loop {
                tokio::select! {
                    _ = poll_shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(mpsc::error::TrySendError::Closed(_)) =
                            invalidate_tx.try_send(Invalidate::Poll)
                        {
                            break;
                        }
                    }
                }
            }
        });

        tokio::spawn(run_consumer(
            backend,
            table_number,
            invalidate_rx,
            view_tx,
            ended_tx,
            shutdown.clone(),
        ));

        tracing::info!(table_number, "Session watcher started");
        Self {
            table_number,
            view: view_rx,
            ended: ended_rx,
            shutdown,
        }
    }

    pub fn table_number(&self) -> i32 {
        self.table_number
    }

    /// Latest view
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// Follow view updates
    pub fn watch(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    /// Next session end; `None` once the watcher stopped
    pub async fn ended(&mut self) -> Option<SessionEnd> {
        self.ended.recv().await
    }

    pub fn stop(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for SessionWatcher {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn run_consumer(
    backend: Arc<dyn DineBackend>,
    table_number: i32,
    mut invalidate_rx: mpsc::Receiver<Invalidate>,
    view_tx: watch::Sender<SessionView>,
    ended_tx: mpsc::Sender<SessionEnd>,
    shutdown: CancellationToken,
) {
    // Kept across failed refetches
    let mut closed = HashSet::new();
    loop {
        let reason = tokio::select! {
            _ = shutdown.cancelled() => break,
            reason = invalidate_rx.recv() => match reason {
                Some(reason) => reason,
                None => break,
            },
        };

        // Coalesce whatever piled up while the last refetch ran
        let mut coalesced = 0usize;
        let mut pending = Some(reason);
        while let Some(reason) = pending.take().or_else(|| invalidate_rx.try_recv().ok()) {
            if let Invalidate::Push { closed: Some(id) } = reason {
                closed.insert(id);
            }
            coalesced += 1;
        }
        tracing::trace!(table_number, coalesced, closed = closed.len(), "Session invalidated");

        let previous = view_tx.borrow().clone();
        let next = match refetch(backend.as_ref(), table_number, &previous).await {
            Some(next) => next,
            None => continue,
        };

        let ends = session_ends(table_number, &previous, &next, &closed);
        closed.clear();
        for end in ends {
            tracing::info!(table_number, ?end, "Table session ended");
            if ended_tx.send(end).await.is_err() {
                return;
            }
        }
        view_tx.send_replace(next);
    }
    tracing::debug!(table_number, "Session watcher stopped");
}

/// Fetch table and recent order; `None` keeps the previous view
async fn refetch(
    backend: &dyn DineBackend,
    table_number: i32,
    previous: &SessionView,
) -> Option<SessionView> {
    let table = match backend.table_status(table_number).await {
        Ok(table) => table,
        Err(e) => {
            tracing::warn!(table_number, error = %e, "Failed to refresh table status");
            return None;
        }
    };
    let order = match backend.recent_order(table_number).await {
        Ok(order) => order,
        Err(e) => {
            tracing::warn!(table_number, error = %e, "Failed to refresh recent order");
            return None;
        }
    };

    Some(SessionView {
        table: Some(table),
        order,
        revision: previous.revision + 1,
    })
}

/// Order id of a change that moved an order to `paid` or `cancelled`
fn closed_order(change: &ChangeEvent) -> Option<String> {
    if change.entity != Entity::Orders {
        return None;
    }
    let status = change.new.as_ref()?.get("status")?.clone();
    let status: OrderStatus = serde_json::from_value(status).ok()?;
    status.is_terminal().then(|| change.id.clone())
}

fn session_ends(
    table_number: i32,
    previous: &SessionView,
    next: &SessionView,
    closed: &HashSet<String>,
) -> Vec<SessionEnd> {
    let mut ends = Vec::new();
    let before = previous.table.as_ref().map(|t| t.status);
    let after = next.table.as_ref().map(|t| t.status);

    if after == Some(TableStatus::Paid) && before != Some(TableStatus::Paid) {
        ends.push(SessionEnd::TablePaid { table_number });
    }

    if let Some(tracked) = &previous.order {
        let released = after == Some(TableStatus::Available)
            && matches!(
                before,
                Some(TableStatus::Occupied | TableStatus::NeedsService)
            );
        if released || closed.contains(&tracked.order.id) {
            ends.push(SessionEnd::OrderClosed {
                order_id: tracked.order.id.clone(),
            });
        }
    }

    ends
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{Order, OrderStatus};

    fn table(status: TableStatus) -> DiningTable {
        DiningTable {
            id: "t5".into(),
            number: 5,
            name: None,
            status,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn order(id: &str) -> OrderDetail {
        OrderDetail {
            order: Order {
                id: id.into(),
                table_number: 5,
                status: OrderStatus::Pending,
                total_amount: 10.0,
                created_at: 0,
                updated_at: 0,
            },
            items: vec![],
        }
    }

    fn view(status: TableStatus, order_id: Option<&str>) -> SessionView {
        SessionView {
            table: Some(table(status)),
            order: order_id.map(order),
            revision: 1,
        }
    }

    fn none() -> HashSet<String> {
        HashSet::new()
    }

    #[test]
    fn test_order_closed_when_table_released() {
        let before = view(TableStatus::Occupied, Some("o1"));
        let after = view(TableStatus::Available, None);
        assert_eq!(
            session_ends(5, &before, &after, &none()),
            vec![SessionEnd::OrderClosed {
                order_id: "o1".into()
            }]
        );
    }

    #[test]
    fn test_newer_order_is_not_an_end() {
        let before = view(TableStatus::Occupied, Some("o1"));
        let after = view(TableStatus::Occupied, Some("o2"));
        assert!(session_ends(5, &before, &after, &none()).is_empty());
    }

    #[test]
    fn test_cancelled_tracked_order_ends_session() {
        let before = view(TableStatus::Occupied, Some("o1"));
        let after = view(TableStatus::Occupied, None);
        let closed = HashSet::from(["o1".to_string()]);
        assert_eq!(
            session_ends(5, &before, &after, &closed),
            vec![SessionEnd::OrderClosed {
                order_id: "o1".into()
            }]
        );

        let other = HashSet::from(["o0".to_string()]);
        assert!(session_ends(5, &before, &after, &other).is_empty());
    }

    #[test]
    fn test_table_paid_reported_once() {
        let before = view(TableStatus::Occupied, None);
        let paid = view(TableStatus::Paid, None);
        assert_eq!(
            session_ends(5, &before, &paid, &none()),
            vec![SessionEnd::TablePaid { table_number: 5 }]
        );
        assert!(session_ends(5, &paid, &paid, &none()).is_empty());
    }

    #[test]
    fn test_same_order_is_not_an_end() {
        let before = view(TableStatus::Occupied, Some("o1"));
        let after = view(TableStatus::NeedsService, Some("o1"));
        assert!(session_ends(5, &before, &after, &none()).is_empty());
    }

    #[test]
    fn test_first_refresh_has_nothing_to_end() {
        let after = view(TableStatus::Available, Some("o1"));
        assert!(session_ends(5, &SessionView::default(), &after, &none()).is_empty());
    }

    #[test]
    fn test_closed_order_from_change() {
        let change = |entity, status: &str| ChangeEvent {
            sequence: 1,
            entity,
            kind: shared::message::ChangeKind::Update,
            id: "o1".into(),
            new: Some(serde_json::json!({ "status": status })),
            old: None,
            timestamp: 0,
        };
        assert_eq!(closed_order(&change(Entity::Orders, "cancelled")), Some("o1".into()));
        assert_eq!(closed_order(&change(Entity::Orders, "paid")), Some("o1".into()));
        assert_eq!(closed_order(&change(Entity::Orders, "preparing")), None);
        assert_eq!(closed_order(&change(Entity::Tables, "paid")), None);
    }
}

//! Staff alert listener
//!
//! Two subscriptions feed one alert stream:
//! - orders INSERT → [`AdminAlert::NewOrder`]
//! - tables UPDATE with `status=eq.needs_service` → [`AdminAlert::WaiterNeeded`]
//!
//! Each subscription resumes from its last sequence after a drop, so an
//! alert raised while disconnected is still delivered.

use crate::auth::AuthContext;
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::subscription::{SubscriptionEvent, spawn_subscription};
use shared::message::{AdminAlert, ChangeFilter, ChangeKind, Entity, RowPredicate};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Filters the staff dashboard listens on
pub fn alert_filters() -> [ChangeFilter; 2] {
    [
        ChangeFilter::entity(Entity::Orders).with_kind(ChangeKind::Insert),
        ChangeFilter::entity(Entity::Tables)
            .with_kind(ChangeKind::Update)
            .with_predicate(RowPredicate::eq("status", "needs_service")),
    ]
}

/// Running listener; dropping it stops the subscriptions
#[derive(Debug)]
pub struct AdminListener {
    alerts: mpsc::Receiver<AdminAlert>,
    shutdown: CancellationToken,
}

impl AdminListener {
    /// Start listening; the session must belong to an admin
    pub fn start(auth: &AuthContext, config: &ClientConfig) -> ClientResult<Self> {
        let user = auth.require_admin()?;
        let shutdown = CancellationToken::new();
        let (alert_tx, alert_rx) = mpsc::channel(config.channel_capacity);

        for filter in alert_filters() {
            let entity = filter.entity;
            let mut events = spawn_subscription(
                auth.backend().clone(),
                filter,
                None,
                config.backoff,
                config.channel_capacity,
                shutdown.clone(),
            );
            let tx = alert_tx.clone();
            tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    let change = match event {
                        SubscriptionEvent::Change(change) => change,
                        SubscriptionEvent::Resync => {
                            tracing::warn!(%entity, "Alert stream resynced; alerts may have been missed");
                            continue;
                        }
                        SubscriptionEvent::Reconnected => continue,
                    };
                    let Some(alert) = AdminAlert::classify(&change) else {
                        continue;
                    };
                    if tx.send(alert).await.is_err() {
                        break;
                    }
                }
            });
        }

        tracing::info!(user_id = %user.user_id, "Admin alert listener started");
        Ok(Self {
            alerts: alert_rx,
            shutdown,
        })
    }

    /// Next alert; `None` once stopped
    pub async fn next_alert(&mut self) -> Option<AdminAlert> {
        self.alerts.recv().await
    }

    pub fn stop(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for AdminListener {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::message::ChangeEvent;

    fn event(entity: Entity, kind: ChangeKind, new: serde_json::Value) -> ChangeEvent {
        ChangeEvent {
            sequence: 1,
            entity,
            kind,
            id: "x".into(),
            new: Some(new),
            old: None,
            timestamp: 0,
        }
    }

    #[test]
    fn test_alert_filters() {
        let [orders, tables] = alert_filters();

        let insert = event(Entity::Orders, ChangeKind::Insert, json!({"table_number": 5}));
        assert!(orders.matches(&insert));
        let update = event(Entity::Orders, ChangeKind::Update, json!({"table_number": 5}));
        assert!(!orders.matches(&update));

        let waiter = event(Entity::Tables, ChangeKind::Update, json!({"number": 3, "status": "needs_service"}));
        assert!(tables.matches(&waiter));
        let occupied = event(Entity::Tables, ChangeKind::Update, json!({"number": 3, "status": "occupied"}));
        assert!(!tables.matches(&occupied));
    }
}

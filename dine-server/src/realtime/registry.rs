//! Live WebSocket subscriptions
//!
//! Tracks every open `/api/realtime` socket with the filter it listens on.
//! Cleanup happens when the session loop exits, whatever the reason.

use dashmap::DashMap;
use shared::message::ChangeFilter;
use std::sync::Arc;

/// One open subscription
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub filter: ChangeFilter,
    pub connected_at: i64,
}

/// Registry of open subscriptions keyed by connection id
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<DashMap<String, ConnectionInfo>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscription and return its connection id
    pub fn register(&self, filter: ChangeFilter) -> String {
        let connection_id = uuid::Uuid::new_v4().to_string();
        let info = ConnectionInfo {
            filter,
            connected_at: shared::util::now_millis(),
        };
        self.connections.insert(connection_id.clone(), info);
        tracing::debug!(connection_id = %connection_id, "Realtime subscriber registered");
        connection_id
    }

    pub fn remove(&self, connection_id: &str) {
        if let Some((_, info)) = self.connections.remove(connection_id) {
            tracing::debug!(
                connection_id = %connection_id,
                entity = %info.filter.entity,
                connected_ms = shared::util::now_millis() - info.connected_at,
                "Realtime subscriber removed"
            );
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

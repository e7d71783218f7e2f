//! Health check
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | /health | GET | none |
//!
//! ```json
//! {
//!   "status": "healthy",
//!   "version": "0.1.0",
//!   "uptime_seconds": 42,
//!   "subscribers": 3,
//!   "store": { "table_count": 12, "current_sequence": 812, ... }
//! }
//! ```

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use std::time::SystemTime;

use crate::core::ServerState;
use crate::storage::StorageStats;

pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

#[derive(Serialize)]
pub struct HealthResponse {
    /// healthy | degraded
    status: &'static str,
    version: &'static str,
    uptime_seconds: u64,
    /// Change feed receivers (WebSocket sessions and listeners)
    subscribers: usize,
    realtime_connections: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    store: Option<StorageStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

static START_TIME: std::sync::OnceLock<SystemTime> = std::sync::OnceLock::new();

/// Called at startup so uptime counts from boot, not from the first probe
pub fn mark_started() {
    START_TIME.get_or_init(SystemTime::now);
}

fn get_uptime_seconds() -> u64 {
    let start = START_TIME.get_or_init(SystemTime::now);
    SystemTime::now()
        .duration_since(*start)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// GET /health
pub async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let (status, store, error) = match state.storage.get_stats() {
        Ok(stats) => ("healthy", Some(stats), None),
        Err(e) => {
            tracing::error!(error = %e, "Health check could not read the store");
            ("degraded", None, Some("store unavailable".to_string()))
        }
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: get_uptime_seconds(),
        subscribers: state.feed.receiver_count(),
        realtime_connections: state.registry.len(),
        store,
        error,
    })
}

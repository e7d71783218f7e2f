//! Backend seam
//!
//! Everything the client needs from the server goes through
//! [`DineBackend`]: JSON requests against the HTTP API and realtime
//! subscriptions. [`RemoteBackend`](crate::RemoteBackend) speaks HTTP and
//! WebSocket; `LocalBackend` (feature `in-process`) calls a `ServerState`
//! living in the same process.

use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;
use http::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::message::{ChangeFilter, RealtimeFrame};
use shared::models::{
    CartSubmission, CurrentUser, DashboardStats, DiningTable, MenuItem, OrderDetail, OrderStatus,
    OrderStatusUpdate, SessionReset, StatusChange, SubmitReceipt, TableStatus, TableToggle,
};
use tokio::sync::mpsc;

/// Transport used by the cart, session and admin flows
#[async_trait]
pub trait DineBackend: Send + Sync {
    /// Send a JSON request; a 2xx body is returned as-is
    async fn request(&self, method: Method, path: &str, body: Option<Value>)
    -> ClientResult<Value>;

    /// Open a realtime subscription; the receiver closes when it drops
    async fn subscribe(
        &self,
        filter: ChangeFilter,
        since: Option<u64>,
    ) -> ClientResult<mpsc::Receiver<RealtimeFrame>>;

    /// Replace the bearer token sent with every request
    fn set_token(&self, token: Option<String>);

    fn token(&self) -> Option<String>;

    // ========== Diner ==========

    async fn menu(&self) -> ClientResult<Vec<MenuItem>> {
        decode(self.request(Method::GET, "/api/menu", None).await?)
    }

    /// `table` is sent as `?table=`, which beats the number in the body
    async fn submit_cart(
        &self,
        table: i32,
        submission: &CartSubmission,
    ) -> ClientResult<SubmitReceipt> {
        let body = serde_json::to_value(submission)?;
        let path = format!("/api/orders?table={}", table);
        decode(self.request(Method::POST, &path, Some(body)).await?)
    }

    async fn table_status(&self, number: i32) -> ClientResult<DiningTable> {
        let path = format!("/api/tables/{}/status", number);
        decode(self.request(Method::GET, &path, None).await?)
    }

    async fn recent_order(&self, number: i32) -> ClientResult<Option<OrderDetail>> {
        let path = format!("/api/tables/{}/recent-order", number);
        decode(self.request(Method::GET, &path, None).await?)
    }

    async fn call_waiter(&self, number: i32) -> ClientResult<DiningTable> {
        let path = format!("/api/tables/{}/call-waiter", number);
        decode(self.request(Method::POST, &path, None).await?)
    }

    // ========== Session ==========

    async fn me(&self) -> ClientResult<CurrentUser> {
        decode(self.request(Method::GET, "/api/auth/me", None).await?)
    }

    // ========== Staff ==========

    async fn list_orders(&self) -> ClientResult<Vec<OrderDetail>> {
        decode(self.request(Method::GET, "/api/orders", None).await?)
    }

    async fn paid_orders(&self) -> ClientResult<Vec<OrderDetail>> {
        decode(self.request(Method::GET, "/api/orders/paid", None).await?)
    }

    async fn set_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
    ) -> ClientResult<StatusChange> {
        let body = serde_json::to_value(OrderStatusUpdate { status })?;
        let path = format!("/api/orders/{}/status", order_id);
        decode(self.request(Method::PUT, &path, Some(body)).await?)
    }

    async fn list_tables(&self) -> ClientResult<Vec<DiningTable>> {
        decode(self.request(Method::GET, "/api/tables", None).await?)
    }

    async fn toggle_table(&self, number: i32, status: TableStatus) -> ClientResult<DiningTable> {
        let body = serde_json::to_value(TableToggle { status })?;
        let path = format!("/api/tables/{}/toggle", number);
        decode(self.request(Method::POST, &path, Some(body)).await?)
    }

    async fn resolve_service(&self, number: i32) -> ClientResult<DiningTable> {
        let path = format!("/api/tables/{}/resolve", number);
        decode(self.request(Method::POST, &path, None).await?)
    }

    async fn reset_table(&self, number: i32) -> ClientResult<SessionReset> {
        let path = format!("/api/tables/{}/reset", number);
        decode(self.request(Method::POST, &path, None).await?)
    }

    async fn stats(&self) -> ClientResult<DashboardStats> {
        decode(self.request(Method::GET, "/api/stats", None).await?)
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> ClientResult<T> {
    serde_json::from_value(value)
        .map_err(|e| ClientError::InvalidResponse(format!("JSON parse error: {}", e)))
}

/// Parse a 2xx body; empty means `null`
pub(crate) fn parse_body(bytes: &[u8]) -> ClientResult<Value> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes)
        .map_err(|e| ClientError::InvalidResponse(format!("JSON parse error: {}", e)))
}

//! API routes
//!
//! - [`health`] - liveness and store counters
//! - [`auth`] - session identity
//! - [`menu`] - active menu and soft delete
//! - [`tables`] - table sessions
//! - [`orders`] - cart submission and order status
//! - [`stats`] - dashboard counters
//! - [`realtime`] - change feed over WebSocket
//!
//! Diner routes are open; see [`crate::auth::is_public_route`]. Staff
//! routes sit behind [`crate::auth::require_admin`].

pub mod auth;
pub mod health;
pub mod menu;
pub mod orders;
pub mod realtime;
pub mod stats;
pub mod tables;

pub use crate::utils::{AppError, AppResult};

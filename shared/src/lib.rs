//! Shared types for the dine workspace
//!
//! Domain models, the change-event protocol carried by the realtime
//! channel, and the unified error/response types used by both the
//! server and the clients.

pub mod error;
pub mod message;
pub mod money;
pub mod models;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

// Message re-exports (for convenient access)
pub use message::{ChangeEvent, ChangeFilter, ChangeKind, Entity, RealtimeFrame};

//! Dine Client - diner and staff side of the table-ordering flow
//!
//! # Modules
//!
//! ```text
//! dine-client/src/
//! ├── cart.rs           # Cart Store (reducer)
//! ├── table_context.rs  # ?table= resolution with local cache
//! ├── checkout.rs       # cart submission with in-flight guard
//! ├── session.rs        # diner session watcher (push + poll → refetch)
//! ├── admin.rs          # staff alerts (new order, waiter needed)
//! ├── auth.rs           # session context, role re-derived on change
//! ├── subscription.rs   # resubscribing realtime feed
//! ├── backend.rs        # DineBackend trait
//! ├── remote.rs         # reqwest + WebSocket backend
//! └── local.rs          # in-process backend (feature "in-process")
//! ```

pub mod admin;
pub mod auth;
pub mod backend;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
#[cfg(feature = "in-process")]
pub mod local;
pub mod remote;
pub mod session;
pub mod subscription;
pub mod table_context;

pub use admin::AdminListener;
pub use auth::AuthContext;
pub use backend::DineBackend;
pub use cart::{CartAction, CartStore};
pub use checkout::{CheckoutError, CheckoutFlow};
pub use config::{Backoff, ClientConfig};
pub use error::{ClientError, ClientResult};
#[cfg(feature = "in-process")]
pub use local::LocalBackend;
pub use remote::RemoteBackend;
pub use session::{SessionEnd, SessionView, SessionWatcher};
pub use subscription::{SubscriptionEvent, spawn_subscription};
pub use table_context::{MemoryTableCache, TableCache, TableContext};

// Re-export shared types for convenience
pub use shared::message::{AdminAlert, RealtimeFrame};
pub use shared::models::{CartItem, SubmitReceipt};

//! Orders
//!
//! # Structure
//!
//! - [`OrderAggregator`] - cart submission (find-or-create + merge)
//! - [`OrderStatusMachine`] - status transitions, payment frees the table
//! - [`OrderQueries`] - read-side views and dashboard counters
//!
//! Only the aggregator and the status machine write `status` or
//! `total_amount`. `cancel_pending_orders` is the one exception, used by a
//! table session reset inside its own transaction.

mod aggregator;
mod error;
mod query;
mod status;

pub use aggregator::{OrderAggregator, cancel_pending_orders};
pub use error::{OrderError, OrderResult};
pub use query::OrderQueries;
pub use status::{OrderStatusMachine, StatusPolicy};
pub use shared::models::StatusChange;

//! Realtime change propagation
//!
//! # Structure
//!
//! - [`ChangeFeed`] - post-commit fan-out of [`ChangeEvent`]s
//! - [`catch_up`] - replay from the change log for (re)connecting subscribers
//! - [`open_stream`] - per-subscriber frames: ready, catch-up, live changes
//! - [`ConnectionRegistry`] - live WebSocket subscriptions
//! - [`alert_listener`] - logs staff alerts from the feed
//!
//! Delivery is at-least-once. A subscriber that lags behind the broadcast
//! buffer, or asks to replay more than the catch-up limit, is told to resync
//! and refetch everything.
//!
//! [`ChangeEvent`]: shared::message::ChangeEvent

mod alerts;
mod feed;
mod registry;
mod stream;
mod sync;

pub use alerts::alert_listener;
pub use feed::{CHANGE_FEED_CAPACITY, ChangeFeed};
pub use registry::{ConnectionInfo, ConnectionRegistry};
pub use stream::{STREAM_BUFFER, open_stream, opening_frames};
pub use sync::{CatchUp, MAX_CATCH_UP_EVENTS, catch_up};

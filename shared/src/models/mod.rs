//! Data models
//!
//! Row types persisted by the server and returned by the API.
//! Ids are uuid v4 strings, timestamps are UTC milliseconds,
//! money is `f64` rounded through [`crate::money`].

pub mod cart;
pub mod dining_table;
pub mod menu;
pub mod order;
pub mod profile;

// Re-exports
pub use cart::*;
pub use dining_table::*;
pub use menu::*;
pub use order::*;
pub use profile::*;

//! Core: configuration, state, server and background tasks
//!
//! - [`Config`] - environment driven settings
//! - [`ServerState`] - shared service handles
//! - [`Server`] - HTTP server lifecycle
//! - [`BackgroundTasks`] - listener and periodic tasks
//! - [`ServerError`] - startup and serving failures

pub mod config;
pub mod error;
pub mod server;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use error::{Result, ServerError};
pub use server::Server;
pub use state::ServerState;
pub use tasks::{BackgroundTasks, TaskKind};

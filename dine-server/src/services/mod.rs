//! Service layer
//!
//! - [`HttpService`] - axum router, TCP serving and in-process dispatch

pub mod http;

pub use self::http::{HttpService, build_app};

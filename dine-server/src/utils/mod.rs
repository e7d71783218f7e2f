//! Utilities
//!
//! - [`json`] - JSON body extractor answering with the error envelope
//! - [`logger`] - tracing subscriber setup and log retention
//! - [`validation`] - text length limits shared by handlers and managers

pub mod json;
pub mod logger;
pub mod validation;

pub use json::AppJson;
pub use shared::error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

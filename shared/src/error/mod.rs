//! Unified error system
//!
//! - [`ErrorCode`]: standardized numeric codes shared with the web clients
//! - [`ErrorCategory`]: classification by code range
//! - [`AppError`]: error with code, message and optional details
//! - [`ApiResponse`]: response envelope used by every endpoint
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order errors
//! - 6xxx: Menu errors
//! - 7xxx: Table errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode, ApiResponse};
//!
//! let err = AppError::with_message(ErrorCode::TableNotFound, "Table 5 not found")
//!     .with_detail("table_number", 5);
//!
//! let response = ApiResponse::<()>::error(&err);
//! assert_eq!(response.code, Some(7001));
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, AppResult};

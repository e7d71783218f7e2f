//! Unified error codes
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order errors
//! - 6xxx: Menu errors
//! - 7xxx: Table errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Serialized as a bare `u16` so web clients can switch on it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Required field missing
    RequiredField = 7,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Session has expired
    SessionExpired = 1005,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Admin role required
    AdminRequired = 2003,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order has already been paid
    OrderAlreadyPaid = 4002,
    /// Order is empty
    OrderEmpty = 4007,
    /// Status change not allowed from the current status
    InvalidStatusTransition = 4010,
    /// Quantity must be a positive integer
    InvalidQuantity = 4011,
    /// Unit price is not a valid amount
    InvalidPrice = 4012,

    // ==================== 6xxx: Menu ====================
    /// Menu item not found
    MenuItemNotFound = 6001,
    /// Menu item is archived
    MenuItemArchived = 6002,

    // ==================== 7xxx: Table ====================
    /// Table not found
    TableNotFound = 7001,
    /// Table session has ended (table was paid)
    TableSessionExpired = 7002,
    /// Table number already in use
    TableNumberTaken = 7003,
    /// Table is inactive
    TableInactive = 7004,
    /// No table number was provided
    TableNumberRequired = 7005,
    /// Table status change not allowed
    InvalidTableTransition = 7006,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Network error
    NetworkError = 9003,
    /// Operation timeout
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
    /// Client disconnected
    ClientDisconnected = 9301,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the default message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Success",
            ErrorCode::Unknown => "Unknown error",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::RequiredField => "Required field is missing",

            // Auth
            ErrorCode::NotAuthenticated => "Authentication required",
            ErrorCode::TokenExpired => "Token has expired",
            ErrorCode::TokenInvalid => "Invalid token",
            ErrorCode::SessionExpired => "Session has expired",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::AdminRequired => "Administrator role is required",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderAlreadyPaid => "Order has already been paid",
            ErrorCode::OrderEmpty => "Order is empty",
            ErrorCode::InvalidStatusTransition => "Status change is not allowed",
            ErrorCode::InvalidQuantity => "Quantity must be at least 1",
            ErrorCode::InvalidPrice => "Invalid price",

            // Menu
            ErrorCode::MenuItemNotFound => "Menu item not found",
            ErrorCode::MenuItemArchived => "Menu item is archived",

            // Table
            ErrorCode::TableNotFound => "Table not found",
            ErrorCode::TableSessionExpired => {
                "Your table session has ended, please scan the QR code again"
            }
            ErrorCode::TableNumberTaken => "Table number already exists",
            ErrorCode::TableInactive => "Table is not accepting orders",
            ErrorCode::TableNumberRequired => "Table number is required",
            ErrorCode::InvalidTableTransition => "Table status change is not allowed",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::ClientDisconnected => "Client disconnected",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            7 => Ok(ErrorCode::RequiredField),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),
            1005 => Ok(ErrorCode::SessionExpired),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2003 => Ok(ErrorCode::AdminRequired),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderAlreadyPaid),
            4007 => Ok(ErrorCode::OrderEmpty),
            4010 => Ok(ErrorCode::InvalidStatusTransition),
            4011 => Ok(ErrorCode::InvalidQuantity),
            4012 => Ok(ErrorCode::InvalidPrice),

            // Menu
            6001 => Ok(ErrorCode::MenuItemNotFound),
            6002 => Ok(ErrorCode::MenuItemArchived),

            // Table
            7001 => Ok(ErrorCode::TableNotFound),
            7002 => Ok(ErrorCode::TableSessionExpired),
            7003 => Ok(ErrorCode::TableNumberTaken),
            7004 => Ok(ErrorCode::TableInactive),
            7005 => Ok(ErrorCode::TableNumberRequired),
            7006 => Ok(ErrorCode::InvalidTableTransition),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::NetworkError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),
            9301 => Ok(ErrorCode::ClientDisconnected),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::ValidationFailed.code(), 2);
        assert_eq!(ErrorCode::SessionExpired.code(), 1005);
        assert_eq!(ErrorCode::AdminRequired.code(), 2003);
        assert_eq!(ErrorCode::OrderNotFound.code(), 4001);
        assert_eq!(ErrorCode::MenuItemNotFound.code(), 6001);
        assert_eq!(ErrorCode::TableSessionExpired.code(), 7002);
        assert_eq!(ErrorCode::DatabaseError.code(), 9002);
    }

    #[test]
    fn test_try_from_valid() {
        assert_eq!(ErrorCode::try_from(7001), Ok(ErrorCode::TableNotFound));
        assert_eq!(
            ErrorCode::try_from(4010),
            Ok(ErrorCode::InvalidStatusTransition)
        );
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(6), Err(InvalidErrorCode(6)));
        assert_eq!(ErrorCode::try_from(65535), Err(InvalidErrorCode(65535)));
    }

    #[test]
    fn test_serde_as_number() {
        let json = serde_json::to_string(&ErrorCode::TableNumberTaken).unwrap();
        assert_eq!(json, "7003");

        let code: ErrorCode = serde_json::from_str("7002").unwrap();
        assert_eq!(code, ErrorCode::TableSessionExpired);

        assert!(serde_json::from_str::<ErrorCode>("12345").is_err());
    }

    #[test]
    fn test_roundtrip_all_codes() {
        let codes = [
            ErrorCode::Success,
            ErrorCode::RequiredField,
            ErrorCode::TokenInvalid,
            ErrorCode::PermissionDenied,
            ErrorCode::OrderEmpty,
            ErrorCode::InvalidPrice,
            ErrorCode::MenuItemArchived,
            ErrorCode::InvalidTableTransition,
            ErrorCode::ClientDisconnected,
        ];
        for code in codes {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }

    #[test]
    fn test_message() {
        assert_eq!(ErrorCode::TableNotFound.message(), "Table not found");
        assert!(ErrorCode::TableSessionExpired.message().contains("scan"));
    }
}

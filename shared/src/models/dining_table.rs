//! Dining Table Model

use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Table session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    #[default]
    Available,
    Occupied,
    NeedsService,
    Reserved,
    /// Session over; diners must re-scan
    Paid,
    Inactive,
}

impl TableStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Occupied => "occupied",
            Self::NeedsService => "needs_service",
            Self::Reserved => "reserved",
            Self::Paid => "paid",
            Self::Inactive => "inactive",
        }
    }

    /// Diners are seated and a session is running
    pub fn has_open_session(&self) -> bool {
        matches!(self, Self::Occupied | Self::NeedsService)
    }
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dining table entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiningTable {
    pub id: String,
    /// Printed on the QR card; unique and >= 1
    pub number: i32,
    pub name: Option<String>,
    pub status: TableStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl DiningTable {
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => format!("Table {}", self.number),
        }
    }
}

/// Create dining table payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DiningTableCreate {
    #[validate(range(min = 1, message = "Table number must be at least 1"))]
    pub number: i32,
    #[validate(length(max = 200, message = "Table name is too long"))]
    pub name: Option<String>,
}

/// Manual status change requested by staff
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TableToggle {
    pub status: TableStatus,
}

/// Public link encoded into a table's QR code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLink {
    pub number: i32,
    pub url: String,
}

/// Outcome of a session reset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReset {
    pub table: DiningTable,
    /// Ids of the pending orders that were cancelled
    pub cancelled_orders: Vec<String>,
}

//! Realtime change protocol
//!
//! Every committed write to a table or order produces one
//! [`ChangeEvent`]. Subscribers receive them through a
//! [`RealtimeFrame`] stream, at least once, in sequence order.
//! Payloads are hints: consumers invalidate and re-query instead of
//! trusting `new`/`old` as state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod alert;
pub mod filter;

pub use alert::*;
pub use filter::*;

/// Entity a change belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Tables,
    Orders,
    OrderItems,
}

impl Entity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tables => "tables",
            Self::Orders => "orders",
            Self::OrderItems => "order_items",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Entity {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tables" => Ok(Self::Tables),
            "orders" => Ok(Self::Orders),
            "order_items" => Ok(Self::OrderItems),
            other => Err(FilterParseError::UnknownEntity(other.to_string())),
        }
    }
}

/// Row-level change kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => f.write_str("INSERT"),
            Self::Update => f.write_str("UPDATE"),
            Self::Delete => f.write_str("DELETE"),
        }
    }
}

impl FromStr for ChangeKind {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INSERT" => Ok(Self::Insert),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            _ => Err(FilterParseError::UnknownEvent(s.to_string())),
        }
    }
}

/// One committed row change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Monotonic per store; gaps never occur
    pub sequence: u64,
    pub entity: Entity,
    pub kind: ChangeKind,
    /// Row id (table number for tables)
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<serde_json::Value>,
    pub timestamp: i64,
}

impl ChangeEvent {
    /// Field of the new row, falling back to the old row
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.new
            .as_ref()
            .and_then(|row| row.get(name))
            .or_else(|| self.old.as_ref().and_then(|row| row.get(name)))
    }

    /// `table_number` for orders, `number` for tables
    pub fn table_number(&self) -> Option<i32> {
        let key = match self.entity {
            Entity::Tables => "number",
            Entity::Orders => "table_number",
            Entity::OrderItems => return None,
        };
        self.field(key)
            .and_then(|v| v.as_i64())
            .and_then(|n| i32::try_from(n).ok())
    }
}

/// Frame pushed to realtime subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealtimeFrame {
    /// Subscription is live; `sequence` is the latest committed change
    Ready { sequence: u64 },
    Change(ChangeEvent),
    /// Changes were lost; refetch everything
    Resync { sequence: u64 },
}

//! Staff alerts derived from change events

use super::{ChangeEvent, ChangeKind, Entity};
use crate::models::TableStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==================== Notification Level ====================

/// Notification level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Audible cue played with an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundCue {
    OrderChime,
    WaiterBell,
}

/// Toast shown to staff or diners
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub message: String,
    pub level: NotificationLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<SoundCue>,
}

impl NotificationPayload {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            level: NotificationLevel::Info,
            sound: None,
        }
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            level: NotificationLevel::Warning,
            sound: None,
        }
    }

    pub fn with_sound(mut self, sound: SoundCue) -> Self {
        self.sound = Some(sound);
        self
    }
}

// ==================== Admin alerts ====================

/// Something staff must react to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "alert", rename_all = "snake_case")]
pub enum AdminAlert {
    NewOrder { table_number: i32, order_id: String },
    WaiterNeeded { table_number: i32 },
}

impl AdminAlert {
    /// Map a change event to an alert, if it warrants one
    ///
    /// - orders INSERT → new order
    /// - tables UPDATE whose new status is `needs_service` → waiter needed
    pub fn classify(event: &ChangeEvent) -> Option<Self> {
        match (event.entity, event.kind) {
            (Entity::Orders, ChangeKind::Insert) => Some(Self::NewOrder {
                table_number: event.table_number()?,
                order_id: event.id.clone(),
            }),
            (Entity::Tables, ChangeKind::Update) => {
                let status = event
                    .new
                    .as_ref()
                    .and_then(|row| row.get("status"))
                    .and_then(|s| serde_json::from_value::<TableStatus>(s.clone()).ok())?;
                if status != TableStatus::NeedsService {
                    return None;
                }
                Some(Self::WaiterNeeded {
                    table_number: event.table_number()?,
                })
            }
            _ => None,
        }
    }

    pub fn table_number(&self) -> i32 {
        match self {
            Self::NewOrder { table_number, .. } | Self::WaiterNeeded { table_number } => {
                *table_number
            }
        }
    }

    pub fn sound(&self) -> SoundCue {
        match self {
            Self::NewOrder { .. } => SoundCue::OrderChime,
            Self::WaiterNeeded { .. } => SoundCue::WaiterBell,
        }
    }

    pub fn to_notification(&self) -> NotificationPayload {
        match self {
            Self::NewOrder { table_number, .. } => NotificationPayload::info(
                "New Order Received!",
                format!("Table {table_number}"),
            ),
            Self::WaiterNeeded { table_number } => {
                NotificationPayload::warning("Waiter Needed!", format!("Table {table_number}"))
            }
        }
        .with_sound(self.sound())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn change(entity: Entity, kind: ChangeKind, new: serde_json::Value) -> ChangeEvent {
        ChangeEvent {
            sequence: 1,
            entity,
            kind,
            id: "o-1".into(),
            new: Some(new),
            old: None,
            timestamp: 0,
        }
    }

    #[test]
    fn test_new_order_alert() {
        let event = change(
            Entity::Orders,
            ChangeKind::Insert,
            json!({"table_number": 5, "status": "pending"}),
        );
        let alert = AdminAlert::classify(&event).unwrap();
        assert_eq!(
            alert,
            AdminAlert::NewOrder {
                table_number: 5,
                order_id: "o-1".into()
            }
        );
        assert_eq!(alert.sound(), SoundCue::OrderChime);
        assert_eq!(alert.to_notification().message, "Table 5");
    }

    #[test]
    fn test_waiter_alert() {
        let event = change(
            Entity::Tables,
            ChangeKind::Update,
            json!({"number": 3, "status": "needs_service"}),
        );
        let alert = AdminAlert::classify(&event).unwrap();
        assert_eq!(alert, AdminAlert::WaiterNeeded { table_number: 3 });
        let toast = alert.to_notification();
        assert_eq!(toast.title, "Waiter Needed!");
        assert_eq!(toast.sound, Some(SoundCue::WaiterBell));
    }

    #[test]
    fn test_no_alert_for_other_changes() {
        let occupied = change(
            Entity::Tables,
            ChangeKind::Update,
            json!({"number": 3, "status": "occupied"}),
        );
        let order_update = change(
            Entity::Orders,
            ChangeKind::Update,
            json!({"table_number": 5, "status": "ready"}),
        );
        assert_eq!(AdminAlert::classify(&occupied), None);
        assert_eq!(AdminAlert::classify(&order_update), None);
    }
}

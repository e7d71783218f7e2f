//! Subscription filters
//!
//! Filters use the `field=eq.value` row predicate syntax, e.g.
//! `status=eq.needs_service`. Only equality is supported.

use super::{ChangeEvent, ChangeKind, Entity};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterParseError {
    #[error("unknown entity: {0}")]
    UnknownEntity(String),
    #[error("unknown event: {0}")]
    UnknownEvent(String),
    #[error("invalid filter '{0}', expected field=eq.value")]
    InvalidPredicate(String),
}

/// Equality predicate on the new row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowPredicate {
    pub field: String,
    pub value: String,
}

impl RowPredicate {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Only the new row is checked; deletes never match
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        let Some(actual) = event.new.as_ref().and_then(|row| row.get(&self.field)) else {
            return false;
        };
        match actual {
            serde_json::Value::String(s) => *s == self.value,
            serde_json::Value::Null => self.value == "null",
            other => other.to_string() == self.value,
        }
    }
}

impl FromStr for RowPredicate {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, rest) = s
            .split_once('=')
            .ok_or_else(|| FilterParseError::InvalidPredicate(s.to_string()))?;
        let value = rest
            .strip_prefix("eq.")
            .ok_or_else(|| FilterParseError::InvalidPredicate(s.to_string()))?;
        if field.is_empty() {
            return Err(FilterParseError::InvalidPredicate(s.to_string()));
        }
        Ok(Self::eq(field, value))
    }
}

impl fmt::Display for RowPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=eq.{}", self.field, self.value)
    }
}

/// What one subscriber wants to hear about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeFilter {
    pub entity: Entity,
    /// `None` means every kind
    pub kind: Option<ChangeKind>,
    pub predicate: Option<RowPredicate>,
}

impl ChangeFilter {
    pub fn entity(entity: Entity) -> Self {
        Self {
            entity,
            kind: None,
            predicate: None,
        }
    }

    pub fn with_kind(mut self, kind: ChangeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_predicate(mut self, predicate: RowPredicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Build from the `entity` / `event` / `filter` query parameters
    pub fn from_params(
        entity: &str,
        event: Option<&str>,
        filter: Option<&str>,
    ) -> Result<Self, FilterParseError> {
        let mut out = Self::entity(entity.parse()?);
        if let Some(event) = event.filter(|e| !e.is_empty() && *e != "*") {
            out.kind = Some(event.parse()?);
        }
        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            out.predicate = Some(filter.parse()?);
        }
        Ok(out)
    }

    /// Query parameters accepted by [`ChangeFilter::from_params`]
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("entity", self.entity.to_string())];
        if let Some(kind) = self.kind {
            params.push(("event", kind.to_string()));
        }
        if let Some(predicate) = &self.predicate {
            params.push(("filter", predicate.to_string()));
        }
        params
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        event.entity == self.entity
            && self.kind.is_none_or(|k| k == event.kind)
            && self.predicate.as_ref().is_none_or(|p| p.matches(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(entity: Entity, kind: ChangeKind, new: serde_json::Value) -> ChangeEvent {
        ChangeEvent {
            sequence: 1,
            entity,
            kind,
            id: "x".into(),
            new: Some(new),
            old: None,
            timestamp: 0,
        }
    }

    #[test]
    fn test_parse_predicate() {
        let p: RowPredicate = "status=eq.needs_service".parse().unwrap();
        assert_eq!(p, RowPredicate::eq("status", "needs_service"));
        assert_eq!(p.to_string(), "status=eq.needs_service");

        assert!("status=needs_service".parse::<RowPredicate>().is_err());
        assert!("=eq.x".parse::<RowPredicate>().is_err());
        assert!("status".parse::<RowPredicate>().is_err());
    }

    #[test]
    fn test_waiter_call_filter() {
        let filter = ChangeFilter::from_params(
            "tables",
            Some("UPDATE"),
            Some("status=eq.needs_service"),
        )
        .unwrap();

        let called = event(
            Entity::Tables,
            ChangeKind::Update,
            json!({"number": 3, "status": "needs_service"}),
        );
        let occupied = event(
            Entity::Tables,
            ChangeKind::Update,
            json!({"number": 3, "status": "occupied"}),
        );
        let order = event(
            Entity::Orders,
            ChangeKind::Update,
            json!({"status": "needs_service"}),
        );

        assert!(filter.matches(&called));
        assert!(!filter.matches(&occupied));
        assert!(!filter.matches(&order));
    }

    #[test]
    fn test_numeric_predicate() {
        let filter = ChangeFilter::entity(Entity::Tables)
            .with_predicate(RowPredicate::eq("number", "5"));
        let hit = event(Entity::Tables, ChangeKind::Update, json!({"number": 5}));
        let miss = event(Entity::Tables, ChangeKind::Update, json!({"number": 15}));
        assert!(filter.matches(&hit));
        assert!(!filter.matches(&miss));
    }

    #[test]
    fn test_wildcard_event_and_params_roundtrip() {
        let filter = ChangeFilter::from_params("orders", Some("*"), None).unwrap();
        assert_eq!(filter.kind, None);

        let filter = ChangeFilter::entity(Entity::Orders).with_kind(ChangeKind::Insert);
        let params = filter.to_params();
        assert_eq!(params, vec![("entity", "orders".to_string()), ("event", "INSERT".to_string())]);
    }
}

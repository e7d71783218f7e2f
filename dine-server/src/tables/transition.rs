//! Table status transitions
//!
//! ```text
//!              order submitted            call waiter
//! available ─────────────────► occupied ─────────────► needs_service
//!     ▲                           ▲                         │
//!     │ order paid / reset        └──── resolve service ────┘
//!     └─────────────────────── (any) ◄── manual toggle (any → any)
//! ```
//!
//! `paid` is the session-terminal state: diners holding a link to a paid
//! table must re-scan. Nothing here expires on its own.

use shared::models::TableStatus;
use std::fmt;
use thiserror::Error;

/// What happened at the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableTrigger {
    OrderSubmitted,
    WaiterCalled,
    OrderPaid,
    ServiceResolved,
    SessionReset,
    ManualToggle(TableStatus),
}

impl fmt::Display for TableTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OrderSubmitted => f.write_str("order submitted"),
            Self::WaiterCalled => f.write_str("waiter called"),
            Self::OrderPaid => f.write_str("order paid"),
            Self::ServiceResolved => f.write_str("service resolved"),
            Self::SessionReset => f.write_str("session reset"),
            Self::ManualToggle(status) => write!(f, "toggle to {}", status),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("table session has ended")]
    SessionExpired,

    #[error("table is inactive")]
    Inactive,

    #[error("cannot apply '{trigger}' to a table that is {from}")]
    Invalid {
        from: TableStatus,
        trigger: TableTrigger,
    },
}

/// Status after `trigger`; equal to `current` when nothing changes
pub fn next_status(
    current: TableStatus,
    trigger: TableTrigger,
) -> Result<TableStatus, TransitionError> {
    use TableStatus::*;

    match trigger {
        TableTrigger::OrderSubmitted => match current {
            Paid => Err(TransitionError::SessionExpired),
            Inactive => Err(TransitionError::Inactive),
            // A pending waiter call stays visible
            NeedsService => Ok(NeedsService),
            Available | Occupied | Reserved => Ok(Occupied),
        },
        TableTrigger::WaiterCalled => Ok(NeedsService),
        TableTrigger::OrderPaid | TableTrigger::SessionReset => Ok(Available),
        TableTrigger::ServiceResolved => match current {
            NeedsService | Occupied => Ok(Occupied),
            from => Err(TransitionError::Invalid { from, trigger }),
        },
        TableTrigger::ManualToggle(target) => Ok(target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TableStatus::*;

    const ALL: [TableStatus; 6] = [Available, Occupied, NeedsService, Reserved, Paid, Inactive];

    #[test]
    fn test_submission_occupies_table() {
        assert_eq!(next_status(Available, TableTrigger::OrderSubmitted), Ok(Occupied));
        assert_eq!(next_status(Occupied, TableTrigger::OrderSubmitted), Ok(Occupied));
        assert_eq!(
            next_status(NeedsService, TableTrigger::OrderSubmitted),
            Ok(NeedsService)
        );
    }

    #[test]
    fn test_submission_rejected_on_paid_or_inactive() {
        assert_eq!(
            next_status(Paid, TableTrigger::OrderSubmitted),
            Err(TransitionError::SessionExpired)
        );
        assert_eq!(
            next_status(Inactive, TableTrigger::OrderSubmitted),
            Err(TransitionError::Inactive)
        );
    }

    #[test]
    fn test_waiter_call_from_any_state() {
        for status in ALL {
            assert_eq!(next_status(status, TableTrigger::WaiterCalled), Ok(NeedsService));
        }
    }

    #[test]
    fn test_payment_and_reset_free_the_table() {
        for status in ALL {
            assert_eq!(next_status(status, TableTrigger::OrderPaid), Ok(Available));
            assert_eq!(next_status(status, TableTrigger::SessionReset), Ok(Available));
        }
    }

    #[test]
    fn test_resolve_service() {
        assert_eq!(
            next_status(NeedsService, TableTrigger::ServiceResolved),
            Ok(Occupied)
        );
        assert_eq!(next_status(Occupied, TableTrigger::ServiceResolved), Ok(Occupied));
        assert!(matches!(
            next_status(Available, TableTrigger::ServiceResolved),
            Err(TransitionError::Invalid { from: Available, .. })
        ));
    }

    #[test]
    fn test_manual_toggle() {
        assert_eq!(
            next_status(Paid, TableTrigger::ManualToggle(Available)),
            Ok(Available)
        );
        assert_eq!(
            next_status(Available, TableTrigger::ManualToggle(Occupied)),
            Ok(Occupied)
        );
        assert_eq!(
            next_status(Occupied, TableTrigger::ManualToggle(Available)),
            Ok(Available)
        );
    }
}

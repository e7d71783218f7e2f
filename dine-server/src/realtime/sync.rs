//! Catch-up for (re)connecting subscribers
//!
//! # Protocol
//!
//! 1. Subscriber connects with the last sequence it processed (`since`)
//! 2. Server compares it to the store's current sequence
//! 3. Small gap: replay the missed changes from `change_log`
//! 4. Large gap, or a `since` from a different store: tell it to resync

use crate::storage::{DineStorage, StorageResult};
use shared::message::ChangeEvent;

/// Default replay limit
pub const MAX_CATCH_UP_EVENTS: usize = 500;

/// What a subscriber must do before consuming live changes
#[derive(Debug, Clone, PartialEq)]
pub enum CatchUp {
    UpToDate { sequence: u64 },
    Replay { events: Vec<ChangeEvent>, sequence: u64 },
    Resync { sequence: u64 },
}

impl CatchUp {
    pub fn sequence(&self) -> u64 {
        match self {
            Self::UpToDate { sequence }
            | Self::Replay { sequence, .. }
            | Self::Resync { sequence } => *sequence,
        }
    }
}

/// Decide how a subscriber that has seen up to `since` catches up
pub fn catch_up(storage: &DineStorage, since: u64, max_events: usize) -> StorageResult<CatchUp> {
    let current = storage.current_sequence()?;

    if since == current {
        return Ok(CatchUp::UpToDate { sequence: current });
    }

    // Ahead of the store: the client remembers another database
    if since > current {
        tracing::info!(since, current, "Subscriber ahead of store, forcing resync");
        return Ok(CatchUp::Resync { sequence: current });
    }

    let gap = current - since;
    if gap > max_events as u64 {
        tracing::info!(since, current, gap, "Catch-up gap too large, forcing resync");
        return Ok(CatchUp::Resync { sequence: current });
    }

    let events = storage.changes_since(since, max_events)?;
    Ok(CatchUp::Replay {
        events,
        sequence: current,
    })
}

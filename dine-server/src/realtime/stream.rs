//! Per-subscriber frame stream
//!
//! ```text
//! open_stream(filter, since)
//!     ├─ 1. Subscribe to the feed (before reading the log)
//!     ├─ 2. ready { sequence }, then replayed changes or resync
//!     └─ 3. Live changes above the cursor that match the filter
//! ```
//!
//! A change committed between steps 1 and 2 can be both replayed and
//! received live; the cursor drops the live copy. Lagging behind the
//! broadcast buffer ends in a resync.

use super::{CatchUp, ChangeFeed, catch_up};
use crate::storage::{DineStorage, StorageResult};
use shared::message::{ChangeFilter, RealtimeFrame};
use tokio::sync::{broadcast, mpsc};

/// Frames buffered per subscriber before the feed starts lagging
pub const STREAM_BUFFER: usize = 64;

/// Opening frames and the cursor the live part starts after
pub fn opening_frames(
    storage: &DineStorage,
    filter: &ChangeFilter,
    since: Option<u64>,
    max_events: usize,
) -> StorageResult<(u64, Vec<RealtimeFrame>)> {
    let plan = match since {
        None => CatchUp::UpToDate {
            sequence: storage.current_sequence()?,
        },
        Some(since) => catch_up(storage, since, max_events)?,
    };

    let sequence = plan.sequence();
    let mut frames = vec![RealtimeFrame::Ready { sequence }];
    match plan {
        CatchUp::UpToDate { .. } => {}
        CatchUp::Replay { events, .. } => {
            frames.extend(
                events
                    .into_iter()
                    .filter(|e| filter.matches(e))
                    .map(RealtimeFrame::Change),
            );
        }
        CatchUp::Resync { sequence } => frames.push(RealtimeFrame::Resync { sequence }),
    }
    Ok((sequence, frames))
}

/// Start a frame stream; it ends when the receiver is dropped
pub fn open_stream(
    storage: DineStorage,
    feed: &ChangeFeed,
    filter: ChangeFilter,
    since: Option<u64>,
    max_events: usize,
) -> mpsc::Receiver<RealtimeFrame> {
    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    let mut feed_rx = feed.subscribe();
    let feed = feed.clone();

    tokio::spawn(async move {
        let mut cursor = match opening_frames(&storage, &filter, since, max_events) {
            Ok((cursor, frames)) => {
                for frame in frames {
                    if tx.send(frame).await.is_err() {
                        return;
                    }
                }
                cursor
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to open change stream");
                return;
            }
        };

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                received = feed_rx.recv() => match received {
                    Ok(event) => {
                        if event.sequence <= cursor {
                            continue;
                        }
                        cursor = event.sequence;
                        if filter.matches(&event)
                            && tx.send(RealtimeFrame::Change(event)).await.is_err()
                        {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, entity = %filter.entity, "Change stream lagged, requesting resync");
                        feed_rx = feed.subscribe();
                        let sequence = match storage.current_sequence() {
                            Ok(sequence) => sequence,
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to read sequence for resync");
                                break;
                            }
                        };
                        cursor = sequence;
                        if tx.send(RealtimeFrame::Resync { sequence }).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::row_image;
    use shared::message::{ChangeKind, Entity};
    use shared::models::{DiningTable, TableStatus};

    fn table(number: i32, status: TableStatus) -> DiningTable {
        DiningTable {
            id: format!("t{number}"),
            number,
            name: None,
            status,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn write_table(storage: &DineStorage, feed: &ChangeFeed, row: &DiningTable) {
        let txn = storage.begin_write().unwrap();
        storage.put_table(&txn, row).unwrap();
        let change = storage
            .append_change(
                &txn,
                Entity::Tables,
                ChangeKind::Update,
                &row.number.to_string(),
                Some(row_image(row).unwrap()),
                None,
            )
            .unwrap();
        txn.commit().unwrap();
        feed.publish(vec![change]);
    }

    #[test]
    fn test_opening_frames_replay_only_matching() {
        let storage = DineStorage::open_in_memory().unwrap();
        let feed = ChangeFeed::new(8);
        write_table(&storage, &feed, &table(1, TableStatus::Occupied));
        write_table(&storage, &feed, &table(2, TableStatus::NeedsService));

        let filter = ChangeFilter::from_params("tables", None, Some("status=eq.needs_service"))
            .unwrap();
        let (cursor, frames) = opening_frames(&storage, &filter, Some(0), 10).unwrap();
        assert_eq!(cursor, 2);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], RealtimeFrame::Ready { sequence: 2 });
        assert!(matches!(&frames[1], RealtimeFrame::Change(e) if e.sequence == 2));
    }

    #[tokio::test]
    async fn test_live_changes_follow_ready() {
        let storage = DineStorage::open_in_memory().unwrap();
        let feed = ChangeFeed::new(8);
        let mut rx = open_stream(
            storage.clone(),
            &feed,
            ChangeFilter::entity(Entity::Tables),
            None,
            10,
        );

        assert_eq!(rx.recv().await, Some(RealtimeFrame::Ready { sequence: 0 }));
        write_table(&storage, &feed, &table(4, TableStatus::Occupied));
        match rx.recv().await {
            Some(RealtimeFrame::Change(event)) => assert_eq!(event.table_number(), Some(4)),
            other => panic!("expected change, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_lag_turns_into_resync() {
        let storage = DineStorage::open_in_memory().unwrap();
        let feed = ChangeFeed::new(2);
        let mut rx = open_stream(
            storage.clone(),
            &feed,
            ChangeFilter::entity(Entity::Tables),
            None,
            10,
        );
        assert_eq!(rx.recv().await, Some(RealtimeFrame::Ready { sequence: 0 }));

        // Fill the stream buffer so the forwarding task stops draining the feed
        for n in 0..(STREAM_BUFFER as i32 + 8) {
            write_table(&storage, &feed, &table(n + 1, TableStatus::Occupied));
            tokio::task::yield_now().await;
        }

        let mut saw_resync = false;
        while let Ok(Some(frame)) =
            tokio::time::timeout(std::time::Duration::from_millis(200), rx.recv()).await
        {
            if matches!(frame, RealtimeFrame::Resync { .. }) {
                saw_resync = true;
                break;
            }
        }
        assert!(saw_resync);
    }
}

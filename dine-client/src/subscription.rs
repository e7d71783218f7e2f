//! Resubscribing realtime feed
//!
//! Wraps [`DineBackend::subscribe`] in a task that survives drops: the
//! last processed sequence is kept and sent as `since` on the next
//! attempt, so the server replays what was missed. Reconnects back off
//! exponentially.

use crate::backend::DineBackend;
use crate::config::Backoff;
use shared::message::{ChangeEvent, ChangeFilter, RealtimeFrame};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// What a resilient subscription reports
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionEvent {
    Change(ChangeEvent),
    /// Changes were lost; refetch everything
    Resync,
    /// Channel is back after a drop; replayed changes follow
    Reconnected,
}

/// Spawn a subscription that resubscribes until `shutdown` or until the
/// returned receiver is dropped
pub fn spawn_subscription(
    backend: Arc<dyn DineBackend>,
    filter: ChangeFilter,
    since: Option<u64>,
    backoff: Backoff,
    capacity: usize,
    shutdown: CancellationToken,
) -> mpsc::Receiver<SubscriptionEvent> {
    let (tx, rx) = mpsc::channel(capacity);

    tokio::spawn(async move {
        let mut since = since;
        let mut delay = backoff.initial;
        let mut connected_before = false;

        loop {
            match backend.subscribe(filter.clone(), since).await {
                Ok(mut frames) => {
                    loop {
                        let frame = tokio::select! {
                            _ = shutdown.cancelled() => return,
                            _ = tx.closed() => return,
                            frame = frames.recv() => frame,
                        };

                        let event = match frame {
                            Some(RealtimeFrame::Ready { sequence }) => {
                                delay = backoff.initial;
                                since.get_or_insert(sequence);
                                if !connected_before {
                                    connected_before = true;
                                    continue;
                                }
                                tracing::info!(entity = %filter.entity, ?since, "Realtime subscription restored");
                                SubscriptionEvent::Reconnected
                            }
                            Some(RealtimeFrame::Change(event)) => {
                                if since.is_some_and(|s| event.sequence <= s) {
                                    continue;
                                }
                                since = Some(event.sequence);
                                SubscriptionEvent::Change(event)
                            }
                            Some(RealtimeFrame::Resync { sequence }) => {
                                since = Some(sequence);
                                SubscriptionEvent::Resync
                            }
                            None => break,
                        };

                        if tx.send(event).await.is_err() {
                            return;
                        }
                    }
                    tracing::warn!(entity = %filter.entity, "Realtime subscription dropped");
                }
                Err(e) => {
                    tracing::warn!(
                        entity = %filter.entity,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Realtime subscribe failed"
                    );
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tx.closed() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            delay = backoff.next(delay);
        }
    });

    rx
}

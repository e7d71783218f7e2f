//! Post-commit change fan-out

use shared::message::ChangeEvent;
use tokio::sync::broadcast;

/// Default broadcast buffer
pub const CHANGE_FEED_CAPACITY: usize = 1024;

/// Broadcast channel carrying committed row changes
///
/// Managers call [`ChangeFeed::publish`] only after their write
/// transaction commits, so subscribers never see a change that was rolled
/// back.
#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl std::fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("tx", &"<broadcast::Sender>")
            .field("receivers", &self.tx.receiver_count())
            .finish()
    }
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        tracing::info!(capacity, "Change feed started");
        Self { tx }
    }

    /// Fan out committed changes in sequence order
    pub fn publish(&self, events: Vec<ChangeEvent>) {
        for event in events {
            let sequence = event.sequence;
            if self.tx.send(event).is_err() {
                tracing::debug!(sequence, "Change broadcast skipped: no active receivers");
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(CHANGE_FEED_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::message::{ChangeKind, Entity};

    fn event(sequence: u64) -> ChangeEvent {
        ChangeEvent {
            sequence,
            entity: Entity::Orders,
            kind: ChangeKind::Insert,
            id: format!("o{}", sequence),
            new: None,
            old: None,
            timestamp: 0,
        }
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_in_order() {
        let feed = ChangeFeed::new(16);
        let mut a = feed.subscribe();
        let mut b = feed.subscribe();

        feed.publish(vec![event(1), event(2)]);

        for rx in [&mut a, &mut b] {
            assert_eq!(rx.recv().await.unwrap().sequence, 1);
            assert_eq!(rx.recv().await.unwrap().sequence, 2);
        }
    }

    #[test]
    fn test_publish_without_subscribers() {
        let feed = ChangeFeed::new(4);
        feed.publish(vec![event(1)]);
        assert_eq!(feed.receiver_count(), 0);
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags() {
        let feed = ChangeFeed::new(2);
        let mut rx = feed.subscribe();
        feed.publish((1..=5).map(event).collect());

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
    }
}

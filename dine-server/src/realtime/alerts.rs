//! Staff alert listener
//!
//! Consumes the change feed and logs every [`AdminAlert`] so alerts are
//! visible in server logs even when no admin client is connected.

use super::ChangeFeed;
use shared::message::AdminAlert;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

/// Run until `shutdown` fires or the feed closes
pub async fn alert_listener(feed: ChangeFeed, shutdown: CancellationToken) {
    let mut rx = feed.subscribe();
    tracing::info!("Alert listener started");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("Alert listener received shutdown signal");
                break;
            }
            received = rx.recv() => match received {
                Ok(event) => {
                    if let Some(alert) = AdminAlert::classify(&event) {
                        let toast = alert.to_notification();
                        tracing::info!(
                            target: "alerts",
                            table_number = alert.table_number(),
                            sequence = event.sequence,
                            sound = ?alert.sound(),
                            "{}: {}",
                            toast.title,
                            toast.message
                        );
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Alert listener lagged behind change feed");
                }
                Err(RecvError::Closed) => {
                    tracing::info!("Change feed closed, alert listener stopping");
                    break;
                }
            }
        }
    }
}

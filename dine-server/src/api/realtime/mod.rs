//! Realtime change feed over WebSocket
//!
//! GET /api/realtime?entity=tables&event=UPDATE&filter=status=eq.needs_service&since=812
//!
//! Server → client frames ([`RealtimeFrame`]):
//! - `ready` with the sequence the stream starts after
//! - `change` for every matching event, replayed ones first
//! - `resync` when changes were lost; the client refetches everything
//!
//! Catch-up and live forwarding are done by [`open_stream`]; this handler
//! only moves frames onto the socket and keeps it alive with pings.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::{Router, routing::get};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use shared::message::{ChangeFilter, RealtimeFrame};
use tokio::time::Duration;

use crate::core::ServerState;
use crate::realtime::open_stream;
use crate::utils::{AppError, AppResult};

const PING_INTERVAL: Duration = Duration::from_secs(30);

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/realtime", get(subscribe))
}

#[derive(Debug, Deserialize)]
pub struct SubscribeQuery {
    entity: Option<String>,
    event: Option<String>,
    filter: Option<String>,
    /// Last sequence the client processed
    since: Option<u64>,
}

/// GET /api/realtime
pub async fn subscribe(
    State(state): State<ServerState>,
    Query(query): Query<SubscribeQuery>,
    ws: WebSocketUpgrade,
) -> AppResult<impl IntoResponse> {
    let entity = query
        .entity
        .as_deref()
        .ok_or_else(|| AppError::validation("entity is required"))?;
    let filter = ChangeFilter::from_params(entity, query.event.as_deref(), query.filter.as_deref())
        .map_err(|e| AppError::validation(e.to_string()))?;

    let since = query.since;
    Ok(ws.on_upgrade(move |socket| realtime_session(socket, state, filter, since)))
}

async fn realtime_session(
    socket: WebSocket,
    state: ServerState,
    filter: ChangeFilter,
    since: Option<u64>,
) {
    let (mut sink, mut stream) = socket.split();
    let connection_id = state.registry.register(filter.clone());
    tracing::info!(connection_id = %connection_id, entity = %filter.entity, ?since, "Realtime subscriber connected");

    let mut frames = open_stream(
        state.storage.clone(),
        &state.feed,
        filter,
        since,
        state.config.max_catch_up_events,
    );

    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.tick().await; // skip immediate

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if sink.send(Message::Ping(vec![].into())).await.is_err() {
                    break;
                }
            }

            frame = frames.recv() => {
                match frame {
                    Some(frame) => {
                        if send_frame(&mut sink, &frame).await.is_err() {
                            break;
                        }
                    }
                    // Stream could not be opened or the feed closed
                    None => break,
                }
            }

            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    // Clients only listen; pongs and stray text are ignored
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.registry.remove(&connection_id);
    tracing::info!(connection_id = %connection_id, "Realtime subscriber disconnected");
}

async fn send_frame<S>(sink: &mut S, frame: &RealtimeFrame) -> Result<(), ()>
where
    S: futures::Sink<Message, Error = axum::Error> + Unpin,
{
    let json = serde_json::to_string(frame).map_err(|_| ())?;
    sink.send(Message::Text(json.into())).await.map_err(|_| ())
}

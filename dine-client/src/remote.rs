//! Network backend: reqwest for the HTTP API, tokio-tungstenite for
//! `/api/realtime`

use crate::backend::{DineBackend, parse_body};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use http::Method;
use parking_lot::RwLock;
use reqwest::{Client, Url};
use serde_json::Value;
use shared::message::{ChangeFilter, RealtimeFrame};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// HTTP + WebSocket client
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    client: Client,
    base_url: String,
    realtime_url: String,
    channel_capacity: usize,
    token: Arc<RwLock<Option<String>>>,
}

impl RemoteBackend {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            realtime_url: config.realtime_url(),
            channel_capacity: config.channel_capacity,
            token: Arc::new(RwLock::new(config.token.clone())),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_header(&self) -> Option<String> {
        self.token.read().as_ref().map(|t| format!("Bearer {}", t))
    }

    fn subscribe_url(&self, filter: &ChangeFilter, since: Option<u64>) -> ClientResult<Url> {
        let mut params = filter.to_params();
        if let Some(since) = since {
            params.push(("since", since.to_string()));
        }
        Url::parse_with_params(&self.realtime_url, &params)
            .map_err(|e| ClientError::InvalidRequest(format!("realtime url: {}", e)))
    }
}

#[async_trait]
impl DineBackend for RemoteBackend {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> ClientResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method, &url);
        if let Some(auth) = self.auth_header() {
            req = req.header(reqwest::header::AUTHORIZATION, auth);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }

        let response = req.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            return Err(ClientError::from_error_body(status, &bytes));
        }
        parse_body(&bytes)
    }

    async fn subscribe(
        &self,
        filter: ChangeFilter,
        since: Option<u64>,
    ) -> ClientResult<mpsc::Receiver<RealtimeFrame>> {
        let url = self.subscribe_url(&filter, since)?;
        let (ws, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| ClientError::Channel(e.to_string()))?;
        tracing::debug!(entity = %filter.entity, ?since, "Realtime channel connected");

        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let (mut sink, mut stream) = ws.split();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tx.closed() => {
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                    msg = stream.next() => match msg {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<RealtimeFrame>(text.as_str()) {
                                Ok(frame) => {
                                    if tx.send(frame).await.is_err() {
                                        break;
                                    }
                                }
                                Err(e) => tracing::warn!(error = %e, "Dropping malformed realtime frame"),
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "Realtime channel error");
                            break;
                        }
                        Some(Ok(_)) => {}
                    },
                }
            }
            tracing::debug!("Realtime channel closed");
        });

        Ok(rx)
    }

    fn set_token(&self, token: Option<String>) {
        *self.token.write() = token;
    }

    fn token(&self) -> Option<String> {
        self.token.read().clone()
    }
}

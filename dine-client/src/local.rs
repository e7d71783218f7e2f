//! In-process backend (feature `in-process`)
//!
//! Requests go through the server's router with tower `oneshot`, and
//! subscriptions read the change feed directly. Same behavior as the
//! network path without sockets.

use crate::backend::{DineBackend, parse_body};
use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;
use axum::body::Body;
use dine_server::ServerState;
use dine_server::realtime::open_stream;
use http::{Method, Request};
use parking_lot::RwLock;
use serde_json::Value;
use shared::message::{ChangeFilter, RealtimeFrame};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Backend bound to a [`ServerState`] in the same process
#[derive(Clone)]
pub struct LocalBackend {
    state: ServerState,
    token: Arc<RwLock<Option<String>>>,
}

impl std::fmt::Debug for LocalBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalBackend")
            .field("state", &"<ServerState>")
            .field("authenticated", &self.token.read().is_some())
            .finish()
    }
}

impl LocalBackend {
    /// `state` must have its HTTP service initialized
    pub fn new(state: ServerState) -> Self {
        Self {
            state,
            token: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_token(self, token: impl Into<String>) -> Self {
        self.set_token(Some(token.into()));
        self
    }

    fn build_request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> ClientResult<Request<Body>> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = self.token.read().as_ref() {
            builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(http::header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json)?)
            }
            None => Body::empty(),
        };
        builder
            .body(body)
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))
    }
}

#[async_trait]
impl DineBackend for LocalBackend {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> ClientResult<Value> {
        let request = self.build_request(method, path, body)?;
        let response = self.state.http.oneshot(request).await?;

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("Failed to read body: {}", e)))?;
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
        Ok(open_stream(
            self.state.storage.clone(),
            &self.state.feed,
            filter,
            since,
            self.state.config.max_catch_up_events,
        ))
    }

    fn set_token(&self, token: Option<String>) {
        *self.token.write() = token;
    }

    fn token(&self) -> Option<String> {
        self.token.read().clone()
    }
}

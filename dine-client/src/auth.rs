//! Session context
//!
//! Holds the identity behind the current token. The role is never kept
//! across a session change: every [`AuthContext::set_session`] asks the
//! server again, and observers see the new identity through a `watch`
//! channel.

use crate::backend::DineBackend;
use crate::error::{ClientError, ClientResult};
use shared::error::AppError;
use shared::models::CurrentUser;
use std::sync::Arc;
use tokio::sync::watch;

/// Identity for one client, passed explicitly to the flows that need it
#[derive(Clone)]
pub struct AuthContext {
    backend: Arc<dyn DineBackend>,
    user: watch::Sender<Option<CurrentUser>>,
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("user", &*self.user.borrow())
            .finish()
    }
}

impl AuthContext {
    /// Anonymous context (diners)
    pub fn new(backend: Arc<dyn DineBackend>) -> Self {
        let (user, _) = watch::channel(None);
        Self { backend, user }
    }

    /// Switch to `token` (or sign out with `None`) and re-derive the user
    pub async fn set_session(&self, token: Option<String>) -> ClientResult<Option<CurrentUser>> {
        self.backend.set_token(token);
        self.refresh().await
    }

    /// Re-derive the user for the current token
    pub async fn refresh(&self) -> ClientResult<Option<CurrentUser>> {
        if self.backend.token().is_none() {
            self.user.send_replace(None);
            return Ok(None);
        }

        match self.backend.me().await {
            Ok(user) => {
                tracing::info!(user_id = %user.user_id, role = ?user.role, "Session changed");
                self.user.send_replace(Some(user.clone()));
                Ok(Some(user))
            }
            Err(e) => {
                self.user.send_replace(None);
                Err(e)
            }
        }
    }

    pub fn current(&self) -> Option<CurrentUser> {
        self.user.borrow().clone()
    }

    pub fn is_admin(&self) -> bool {
        self.user.borrow().as_ref().is_some_and(CurrentUser::is_admin)
    }

    /// Current user if it is an admin
    pub fn require_admin(&self) -> ClientResult<CurrentUser> {
        match self.current() {
            Some(user) if user.is_admin() => Ok(user),
            Some(_) => Err(AppError::admin_required().into()),
            None => Err(ClientError::from(AppError::not_authenticated())),
        }
    }

    /// Follow session changes
    pub fn watch(&self) -> watch::Receiver<Option<CurrentUser>> {
        self.user.subscribe()
    }

    pub fn backend(&self) -> &Arc<dyn DineBackend> {
        &self.backend
    }
}

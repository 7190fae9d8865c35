//! Shared handle to the current [`Session`].

use std::sync::Arc;

use cv_core::{AppError, Result, Session};
use tokio::sync::watch;

/// Cloneable handle every state holder receives at construction.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: Arc<watch::Sender<Option<Arc<Session>>>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> Option<Arc<Session>> {
        self.tx.borrow().clone()
    }

    /// The current session or `Unauthorized`.
    pub fn require(&self) -> Result<Arc<Session>> {
        self.current().ok_or_else(AppError::missing_session)
    }

    /// The current session together with the acting user's id.
    pub fn require_user(&self) -> Result<(Arc<Session>, String)> {
        let session = self.require()?;
        let user_id = session.user_id.clone().ok_or_else(AppError::missing_session)?;
        Ok((session, user_id))
    }

    pub fn set(&self, session: Option<Session>) {
        self.tx.send_replace(session.map(Arc::new));
    }

    /// Installs an already shared session.
    pub fn activate(&self, session: Arc<Session>) {
        self.tx.send_replace(Some(session));
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Session>>> {
        self.tx.subscribe()
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

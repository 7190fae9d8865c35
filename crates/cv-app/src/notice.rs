//! Transient messages for the presentation layer (toasts, snackbars).

use cv_core::{AppError, VoteTarget};
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Error(String),
    /// An optimistic vote was undone after its request failed.
    VoteRolledBack { target: VoteTarget, message: String },
    Info(String),
}

/// Fan-out of [`Notice`]s. Sending with nobody listening is not an error.
#[derive(Debug, Clone)]
pub struct Notices {
    tx: broadcast::Sender<Notice>,
}

impl Notices {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    pub fn emit(&self, notice: Notice) {
        let _ = self.tx.send(notice);
    }

    pub fn error(&self, err: &AppError) {
        self.emit(Notice::Error(err.user_message()));
    }
}

impl Default for Notices {
    fn default() -> Self {
        Self::new(64)
    }
}

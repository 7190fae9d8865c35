//! Single-thread screen: the thread, its comments, votes on both, replies.

use std::sync::Arc;

use cv_core::{
    AppError, Result, Thread, VoteDirection, VoteHost, VoteSets, VoteTarget,
};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::enrich::enrich_thread_detail;
use crate::store::ErrorSlot;
use crate::votes::{VoteController, VoteOutcome};
use crate::Services;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThreadDetailState {
    pub thread: Option<Thread>,
    pub loading: bool,
    pub error: Option<String>,
}

impl ErrorSlot for ThreadDetailState {
    fn set_error(&mut self, message: Option<String>) {
        self.error = message;
    }
}

impl VoteHost for ThreadDetailState {
    fn votes_mut(&mut self, target: &VoteTarget) -> Option<&mut VoteSets> {
        self.thread.votes_mut(target)
    }
}

pub struct ThreadDetailStore {
    thread_id: String,
    services: Services,
    votes: Arc<VoteController>,
    state: Arc<watch::Sender<ThreadDetailState>>,
}

impl ThreadDetailStore {
    /// Creates an empty holder for `thread_id`. Call [`refresh`](Self::refresh)
    /// to load it.
    pub fn open(services: &Services, thread_id: impl Into<String>) -> Self {
        let votes = Arc::new(VoteController::new(
            services.threads.clone(),
            services.session.clone(),
            services.notices.clone(),
        ));
        Self {
            thread_id: thread_id.into(),
            services: services.clone(),
            votes,
            state: Arc::new(watch::channel(ThreadDetailState::default()).0),
        }
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn subscribe(&self) -> watch::Receiver<ThreadDetailState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ThreadDetailState {
        self.state.borrow().clone()
    }

    pub fn thread(&self) -> Option<Thread> {
        self.state.borrow().thread.clone()
    }

    /// Loads the thread and fills in author info for it and its comments.
    /// Votes still in flight stay applied on the fresh copy.
    pub async fn refresh(&self) -> Result<()> {
        let session = match self.services.session.require() {
            Ok(session) => session,
            Err(e) => return Err(self.surface(e)),
        };
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });

        let thread = match self.services.threads.get_thread_by_id(&session, &self.thread_id).await {
            Ok(thread) => thread,
            Err(e) => {
                warn!(thread = %self.thread_id, error = %e, "thread load failed");
                return Err(self.surface(e));
            }
        };
        let thread = enrich_thread_detail(self.services.users.as_ref(), &session, thread).await;
        debug!(thread = %self.thread_id, comments = thread.comments.len(), "thread loaded");

        self.votes.rebase(&self.state, |s| {
            s.thread = Some(thread);
            s.loading = false;
        });
        Ok(())
    }

    pub async fn vote_thread(&self, direction: VoteDirection) -> Result<VoteOutcome> {
        self.votes
            .vote(&self.state, VoteTarget::thread(self.thread_id.as_str()), direction)
            .await
    }

    pub async fn vote_comment(&self, comment_id: &str, direction: VoteDirection) -> Result<VoteOutcome> {
        self.votes
            .vote(
                &self.state,
                VoteTarget::comment(self.thread_id.as_str(), comment_id),
                direction,
            )
            .await
    }

    /// Posts a reply and reloads the thread so the new comment shows up.
    pub async fn add_comment(&self, content: &str) -> Result<()> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("Comment cannot be empty.".to_string()));
        }
        let session = self.services.session.require().map_err(|e| self.surface(e))?;

        if let Err(e) = self
            .services
            .threads
            .add_comment(&session, &self.thread_id, content)
            .await
        {
            warn!(thread = %self.thread_id, error = %e, "failed to add comment");
            return Err(self.surface(e));
        }
        debug!(thread = %self.thread_id, "comment added");
        self.refresh().await
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|s| s.error.take().is_some());
    }

    fn surface(&self, err: AppError) -> AppError {
        let message = err.user_message();
        self.state.send_modify(|s| {
            s.loading = false;
            s.error = Some(message);
        });
        self.services.notices.error(&err);
        err
    }
}

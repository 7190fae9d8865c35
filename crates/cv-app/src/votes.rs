//! # Optimistic votes
//!
//! [`VoteController`] applies vote toggles to local state immediately, sends
//! the request, and rolls the target back when the request fails. The
//! bookkeeping lives in [`cv_core::VoteLedger`]; this type adds the I/O.
//!
//! Requests for one target run on a spawned task, so a caller that gives up
//! waiting never leaves the target's queue without a sender.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cv_core::{
    AppError, Applied, MutationTicket, Result, Session, ThreadApi, VoteDirection, VoteHost,
    VoteIntent, VoteLedger, VoteTarget,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::notice::{Notice, Notices};
use crate::session::SessionHandle;
use crate::store::ErrorSlot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Target not in local state; nothing was sent.
    Ignored,
    /// Applied locally; its request waits behind another on the same target
    /// and is sent by the task that owns that one.
    Queued,
    /// Every request sent for this call was accepted.
    Committed,
}

pub struct VoteController {
    api: Arc<dyn ThreadApi>,
    session: SessionHandle,
    notices: Notices,
    ledger: Mutex<VoteLedger>,
}

impl VoteController {
    pub fn new(api: Arc<dyn ThreadApi>, session: SessionHandle, notices: Notices) -> Self {
        Self {
            api,
            session,
            notices,
            ledger: Mutex::new(VoteLedger::new()),
        }
    }

    /// Toggles the current user's vote on `target` inside `state`.
    ///
    /// Without a session this fails with `Unauthorized` before touching
    /// state. A request failure restores the target's votes, records the
    /// error in `state` and emits exactly one [`Notice::VoteRolledBack`].
    /// There is no automatic retry.
    ///
    /// Dropping the returned future does not stop the requests: they finish
    /// on their own task and settle `state` as usual.
    pub async fn vote<S>(
        self: &Arc<Self>,
        state: &Arc<watch::Sender<S>>,
        target: VoteTarget,
        direction: VoteDirection,
    ) -> Result<VoteOutcome>
    where
        S: VoteHost + ErrorSlot + Send + Sync + 'static,
    {
        let (session, acting_user_id) = self.session.require_user()?;
        let intent = VoteIntent {
            target,
            direction,
            acting_user_id,
        };

        let applied = {
            let mut ledger = self.ledger();
            let mut applied = Applied::Missing;
            state.send_if_modified(|s| {
                applied = ledger.apply(s, &intent);
                applied != Applied::Missing
            });
            applied
        };

        let ticket = match applied {
            Applied::Missing => return Ok(VoteOutcome::Ignored),
            Applied::Queued(_) => return Ok(VoteOutcome::Queued),
            Applied::Dispatch(ticket) => ticket,
        };

        let controller = Arc::clone(self);
        let state = Arc::clone(state);
        let chain = tokio::spawn(async move { controller.drive(&state, &session, ticket).await });
        match chain.await {
            Ok(result) => result.map(|()| VoteOutcome::Committed),
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(AppError::Network(format!("vote dispatch stopped: {e}"))),
        }
    }

    /// Replaces `state` through `install` and folds the pending votes into
    /// the fresh copy. Refreshes of vote-bearing state go through here.
    pub fn rebase<S: VoteHost>(&self, state: &watch::Sender<S>, install: impl FnOnce(&mut S)) {
        let mut ledger = self.ledger();
        state.send_modify(|s| {
            install(s);
            ledger.rebase(s);
        });
    }

    pub fn pending_count(&self) -> usize {
        self.ledger().pending_count()
    }

    fn ledger(&self) -> MutexGuard<'_, VoteLedger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sends `ticket`, then every vote queued behind it, until the target's
    /// queue drains or a request fails.
    async fn drive<S>(&self, state: &watch::Sender<S>, session: &Session, mut ticket: MutationTicket) -> Result<()>
    where
        S: VoteHost + ErrorSlot,
    {
        loop {
            match self.send(session, &ticket).await {
                Ok(()) => {
                    let next = self.ledger().commit(&ticket);
                    match next {
                        Some(queued) => ticket = queued,
                        None => return Ok(()),
                    }
                }
                Err(err) => {
                    self.roll_back(state, &ticket, &err);
                    return Err(err);
                }
            }
        }
    }

    async fn send(&self, session: &Session, ticket: &MutationTicket) -> Result<()> {
        debug!(ticket = ticket.id, target = %ticket.target, direction = %ticket.direction, "sending vote");
        match &ticket.target {
            VoteTarget::Thread(thread_id) => self.api.vote(session, thread_id, ticket.direction).await,
            VoteTarget::Comment { thread_id, comment_id } => {
                self.api
                    .vote_comment(session, thread_id, comment_id, ticket.direction)
                    .await
            }
        }
    }

    fn roll_back<S>(&self, state: &watch::Sender<S>, ticket: &MutationTicket, err: &AppError)
    where
        S: VoteHost + ErrorSlot,
    {
        let message = format!("Error during {}: {}", ticket.direction, err.user_message());
        let rollback = {
            let mut ledger = self.ledger();
            let mut rollback = Default::default();
            state.send_modify(|s| {
                rollback = ledger.rollback(s, ticket);
                s.set_error(Some(message.clone()));
            });
            rollback
        };

        if err.is_rollback_trigger() {
            warn!(ticket = ticket.id, target = %ticket.target, error = %err, "vote failed, rolled back");
        } else {
            info!(ticket = ticket.id, target = %ticket.target, error = %err, "vote refused, rolled back");
        }
        if !rollback.discarded.is_empty() {
            debug!(count = rollback.discarded.len(), "dropped queued votes on the same target");
        }

        self.notices.emit(Notice::VoteRolledBack {
            target: ticket.target.clone(),
            message,
        });
    }
}

//! # Vote Ledger
//!
//! Bookkeeping for optimistic votes. Every applied intent gets a ticket and a
//! snapshot of its target's vote sets taken right before the toggle.
//!
//! Requests are serialised per target: only the head of a target's queue is
//! in flight. Later intents on the same target are applied locally at once and
//! wait for the head to commit before their request is sent. Rolling back a
//! ticket restores its snapshot, which also undoes every mutation queued after
//! it on that target, so those are discarded without ever being sent.
//!
//! A refresh that replaces local state while votes are pending is folded in
//! with [`VoteLedger::rebase`], so fresh votes by other users survive both
//! outcomes and the acting user's pending vote stays visible.

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::vote::{VoteDirection, VoteHost, VoteIntent, VoteSets, VoteTarget};

/// Handle for one optimistic mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationTicket {
    pub id: u64,
    pub target: VoteTarget,
    pub direction: VoteDirection,
}

#[derive(Debug)]
struct PendingVote {
    ticket: MutationTicket,
    user: String,
    snapshot: VoteSets,
}

/// Outcome of [`VoteLedger::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// Target not in local state. Nothing changed, nothing to send.
    Missing,
    /// Applied; the caller must send the request for this ticket now.
    Dispatch(MutationTicket),
    /// Applied; the request waits behind an in-flight one on the same target.
    Queued(MutationTicket),
}

/// Outcome of [`VoteLedger::rollback`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rollback {
    /// Whether the snapshot was written back (false if the target vanished).
    pub restored: bool,
    /// Queued mutations dropped along with the failed one.
    pub discarded: Vec<MutationTicket>,
}

#[derive(Debug, Default)]
pub struct VoteLedger {
    next_id: u64,
    pending: HashMap<VoteTarget, VecDeque<PendingVote>>,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggles the intent's vote in `host` and records how to undo it.
    pub fn apply<H: VoteHost + ?Sized>(&mut self, host: &mut H, intent: &VoteIntent) -> Applied {
        let Some(votes) = host.votes_mut(&intent.target) else {
            debug!(target = %intent.target, "vote target not present, ignoring");
            return Applied::Missing;
        };

        let snapshot = votes.clone();
        votes.toggle(intent.direction, &intent.acting_user_id);

        self.next_id += 1;
        let ticket = MutationTicket {
            id: self.next_id,
            target: intent.target.clone(),
            direction: intent.direction,
        };

        let queue = self.pending.entry(intent.target.clone()).or_default();
        queue.push_back(PendingVote {
            ticket: ticket.clone(),
            user: intent.acting_user_id.clone(),
            snapshot,
        });

        if queue.len() == 1 {
            debug!(ticket = ticket.id, target = %ticket.target, "vote applied, dispatching");
            Applied::Dispatch(ticket)
        } else {
            debug!(ticket = ticket.id, target = %ticket.target, depth = queue.len(), "vote applied, queued");
            Applied::Queued(ticket)
        }
    }

    /// Marks `ticket` as confirmed by the server and returns the next ticket
    /// on the same target that must now be dispatched.
    pub fn commit(&mut self, ticket: &MutationTicket) -> Option<MutationTicket> {
        let queue = self.pending.get_mut(&ticket.target)?;
        if queue.front().map(|p| p.ticket.id) != Some(ticket.id) {
            debug!(ticket = ticket.id, "commit for ticket no longer at head, ignoring");
            return None;
        }
        queue.pop_front();
        let next = queue.front().map(|p| p.ticket.clone());
        if queue.is_empty() {
            self.pending.remove(&ticket.target);
        }
        debug!(ticket = ticket.id, next = ?next.as_ref().map(|t| t.id), "vote committed");
        next
    }

    /// Undoes `ticket` (and everything queued after it on the same target).
    pub fn rollback<H: VoteHost + ?Sized>(&mut self, host: &mut H, ticket: &MutationTicket) -> Rollback {
        let Some(queue) = self.pending.get_mut(&ticket.target) else {
            return Rollback::default();
        };
        let Some(pos) = queue.iter().position(|p| p.ticket.id == ticket.id) else {
            return Rollback::default();
        };

        let mut dropped = queue.split_off(pos);
        if queue.is_empty() {
            self.pending.remove(&ticket.target);
        }

        // `pos` is the failed ticket; its snapshot predates everything after it.
        let Some(failed) = dropped.pop_front() else {
            return Rollback::default();
        };
        let restored = match host.votes_mut(&ticket.target) {
            Some(votes) => {
                *votes = failed.snapshot;
                true
            }
            None => false,
        };

        let discarded: Vec<MutationTicket> = dropped.into_iter().map(|p| p.ticket).collect();
        debug!(ticket = ticket.id, restored, discarded = discarded.len(), "vote rolled back");
        Rollback { restored, discarded }
    }

    /// Folds freshly fetched vote sets in `host` into the pending mutations.
    ///
    /// For every pending target still present, each snapshot becomes the fresh
    /// sets with the acting user's vote as it stood before that snapshot's
    /// toggle, and `host` shows the user's vote as the queued toggles leave it.
    /// Returns the number of targets rebased.
    pub fn rebase<H: VoteHost + ?Sized>(&mut self, host: &mut H) -> usize {
        let mut rebased = 0;
        for (target, queue) in self.pending.iter_mut() {
            let Some(votes) = host.votes_mut(target) else {
                continue;
            };
            let fresh = votes.clone();
            for pending in queue.iter_mut() {
                let before = pending.snapshot.user_vote(&pending.user);
                let mut snapshot = fresh.clone();
                snapshot.set_user_vote(&pending.user, before);
                pending.snapshot = snapshot;
            }
            if let Some(last) = queue.back() {
                let mut after = last.snapshot.clone();
                after.toggle(last.ticket.direction, &last.user);
                votes.set_user_vote(&last.user, after.user_vote(&last.user));
            }
            rebased += 1;
        }
        if rebased > 0 {
            debug!(rebased, "pending votes rebased onto fresh state");
        }
        rebased
    }

    pub fn is_in_flight(&self, target: &VoteTarget) -> bool {
        self.pending.contains_key(target)
    }

    /// Number of applied mutations not yet committed or rolled back.
    pub fn pending_count(&self) -> usize {
        self.pending.values().map(VecDeque::len).sum()
    }

    /// Forgets every pending mutation without touching local state.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

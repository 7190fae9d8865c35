//! # Votes
//!
//! Toggle semantics shared by threads and comments. A user id appears in at
//! most one of `upvotes` / `downvotes` of the same entity at any time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::Thread;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteDirection {
    #[serde(rename = "upvote")]
    Up,
    #[serde(rename = "downvote")]
    Down,
}

impl VoteDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteDirection::Up => "upvote",
            VoteDirection::Down => "downvote",
        }
    }
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteDirection {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "upvote" => Ok(VoteDirection::Up),
            "down" | "downvote" => Ok(VoteDirection::Down),
            other => Err(AppError::Validation(format!("unknown vote direction '{other}'"))),
        }
    }
}

/// Upvote/downvote membership of a single votable entity.
///
/// Stored as ordered lists to keep the server's ordering; [`VoteSets::toggle`]
/// never introduces duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteSets {
    #[serde(default)]
    pub upvotes: Vec<String>,
    #[serde(default)]
    pub downvotes: Vec<String>,
}

impl VoteSets {
    pub fn new(upvotes: Vec<String>, downvotes: Vec<String>) -> Self {
        Self { upvotes, downvotes }
    }

    /// Applies one vote toggle for `user`.
    ///
    /// Voting in the direction already held removes the vote. Voting in the
    /// other direction adds it there and clears the opposite one.
    pub fn toggle(&mut self, direction: VoteDirection, user: &str) {
        let (same, opposite) = match direction {
            VoteDirection::Up => (&mut self.upvotes, &mut self.downvotes),
            VoteDirection::Down => (&mut self.downvotes, &mut self.upvotes),
        };

        if same.iter().any(|id| id == user) {
            same.retain(|id| id != user);
        } else {
            same.push(user.to_string());
        }
        opposite.retain(|id| id != user);
    }

    pub fn user_vote(&self, user: &str) -> Option<VoteDirection> {
        if self.upvotes.iter().any(|id| id == user) {
            Some(VoteDirection::Up)
        } else if self.downvotes.iter().any(|id| id == user) {
            Some(VoteDirection::Down)
        } else {
            None
        }
    }

    /// Puts `user` in the set matching `vote`, or in neither for `None`.
    /// Lists that already agree are left untouched.
    pub fn set_user_vote(&mut self, user: &str, vote: Option<VoteDirection>) {
        if self.user_vote(user) == vote {
            return;
        }
        self.upvotes.retain(|id| id != user);
        self.downvotes.retain(|id| id != user);
        match vote {
            Some(VoteDirection::Up) => self.upvotes.push(user.to_string()),
            Some(VoteDirection::Down) => self.downvotes.push(user.to_string()),
            None => {}
        }
    }

    pub fn score(&self) -> i64 {
        self.upvotes.len() as i64 - self.downvotes.len() as i64
    }
}

/// The entity a vote applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VoteTarget {
    Thread(String),
    Comment { thread_id: String, comment_id: String },
}

impl VoteTarget {
    pub fn thread(id: impl Into<String>) -> Self {
        VoteTarget::Thread(id.into())
    }

    pub fn comment(thread_id: impl Into<String>, comment_id: impl Into<String>) -> Self {
        VoteTarget::Comment {
            thread_id: thread_id.into(),
            comment_id: comment_id.into(),
        }
    }

    pub fn thread_id(&self) -> &str {
        match self {
            VoteTarget::Thread(id) => id,
            VoteTarget::Comment { thread_id, .. } => thread_id,
        }
    }
}

impl fmt::Display for VoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteTarget::Thread(id) => write!(f, "thread {id}"),
            VoteTarget::Comment { thread_id, comment_id } => {
                write!(f, "comment {comment_id} in thread {thread_id}")
            }
        }
    }
}

/// A user's request to vote on a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteIntent {
    pub target: VoteTarget,
    pub direction: VoteDirection,
    pub acting_user_id: String,
}

/// Anything that can locate the vote sets of a [`VoteTarget`] it contains.
pub trait VoteHost {
    fn votes_mut(&mut self, target: &VoteTarget) -> Option<&mut VoteSets>;
}

impl VoteHost for Thread {
    fn votes_mut(&mut self, target: &VoteTarget) -> Option<&mut VoteSets> {
        match target {
            VoteTarget::Thread(id) if *id == self.id => Some(&mut self.votes),
            VoteTarget::Comment { thread_id, comment_id } if *thread_id == self.id => self
                .comments
                .iter_mut()
                .find(|c| c.comment_id == *comment_id)
                .map(|c| &mut c.votes),
            _ => None,
        }
    }
}

impl<H: VoteHost> VoteHost for Option<H> {
    fn votes_mut(&mut self, target: &VoteTarget) -> Option<&mut VoteSets> {
        self.as_mut().and_then(|host| host.votes_mut(target))
    }
}

impl VoteHost for Vec<Thread> {
    fn votes_mut(&mut self, target: &VoteTarget) -> Option<&mut VoteSets> {
        let thread_id = target.thread_id();
        self.iter_mut()
            .find(|t| t.id == thread_id)
            .and_then(|t| t.votes_mut(target))
    }
}

/// Applies `intent` in place. Returns `false` (and changes nothing) when the
/// target is not present in `host`.
pub fn apply_vote<H: VoteHost + ?Sized>(host: &mut H, intent: &VoteIntent) -> bool {
    match host.votes_mut(&intent.target) {
        Some(votes) => {
            votes.toggle(intent.direction, &intent.acting_user_id);
            true
        }
        None => false,
    }
}

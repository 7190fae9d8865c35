//! # Domain Models
//!
//! These structs mirror the JSON documents served by the campvoiceus backend.
//! Identifiers are opaque strings assigned by the server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::vote::VoteSets;

/// A discussion thread as returned by the thread endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub content: String,
    pub author_id: String,
    /// Filled locally from the author's profile; the server only sends `authorId`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_avatar_url: Option<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(flatten)]
    pub votes: VoteSets,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<ThreadFile>,
    pub created_at: DateTime<Utc>,
}

impl Thread {
    /// Copies the display fields of `author` onto the thread.
    pub fn with_author(mut self, author: &AuthorInfo) -> Self {
        self.author_name = Some(author.name.clone());
        self.author_username = Some(author.username.clone());
        self.author_avatar_url = author.avatar_url.clone();
        self
    }

    pub fn comment(&self, comment_id: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.comment_id == comment_id)
    }
}

/// A comment nested inside a [`Thread`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub comment_id: String,
    pub user_id: String,
    pub content: String,
    #[serde(flatten)]
    pub votes: VoteSets,
    pub created_at: DateTime<Utc>,
    // Author display fields, filled by enrichment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Comment {
    pub fn with_author(mut self, author: &AuthorInfo) -> Self {
        self.user_name = Some(author.username.clone());
        self.avatar_url = author.avatar_url.clone();
        self.name = Some(author.name.clone());
        self
    }
}

/// File attached to a thread at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadFile {
    pub url: String,
    pub name: String,
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// The subset of a [`User`] shown next to threads and comments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorInfo {
    pub name: String,
    pub username: String,
    pub avatar_url: Option<String>,
}

impl From<&User> for AuthorInfo {
    fn from(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            username: user.username.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

/// An in-app notification (reply, vote, mention...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A user listed under "who voted on this".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voter {
    pub username: String,
    pub name: String,
    pub avatar_url: String,
}

impl From<User> for Voter {
    fn from(user: User) -> Self {
        let username = if user.username.is_empty() { "unknown".to_string() } else { user.username };
        let name = if user.name.is_empty() { "Unknown User".to_string() } else { user.name };
        Self {
            username,
            name,
            avatar_url: user.avatar_url.unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Request / response payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub token: Option<String>,
}

/// Binary payload uploaded alongside a thread or a profile update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// A thread about to be created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewThread {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub attachment: Option<Attachment>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: String,
    pub bio: Option<String>,
    pub avatar: Option<Attachment>,
}

/// Body of the by-id lookups for threads and users.
#[derive(Debug, Clone, Serialize)]
pub struct IdRequest {
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub thread_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentVoteRequest {
    pub thread_id: String,
    pub comment_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCommentRequest {
    pub thread_id: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushTokenRequest {
    pub fcm_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThreadEnvelope {
    pub thread: Thread,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThreadsEnvelope {
    #[serde(default)]
    pub threads: Vec<Thread>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsEnvelope {
    #[serde(default)]
    pub notifications: Vec<Notification>,
}

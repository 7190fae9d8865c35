//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the state holders.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{
    LoginRequest, NewThread, Notification, ProfileUpdate, RegisterRequest, RegisterResponse,
    Thread, User,
};
use crate::session::Session;
use crate::vote::VoteDirection;

/// Remote contract for threads, comments and votes.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ThreadApi: Send + Sync {
    // Thread listings
    async fn get_threads(&self, session: &Session) -> Result<Vec<Thread>>;
    async fn get_thread_by_id(&self, session: &Session, id: &str) -> Result<Thread>;
    async fn get_threads_by_tag(&self, session: &Session, tag: &str) -> Result<Vec<Thread>>;
    async fn get_user_threads(&self, session: &Session, user_id: &str) -> Result<Vec<Thread>>;

    // Mutations
    async fn create_thread(&self, session: &Session, thread: &NewThread) -> Result<()>;
    async fn vote(&self, session: &Session, thread_id: &str, direction: VoteDirection) -> Result<()>;
    async fn vote_comment(
        &self,
        session: &Session,
        thread_id: &str,
        comment_id: &str,
        direction: VoteDirection,
    ) -> Result<()>;
    async fn add_comment(&self, session: &Session, thread_id: &str, content: &str) -> Result<()>;
}

/// Remote contract for accounts, profiles and notifications.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserApi: Send + Sync {
    /// Exchanges credentials for a bearer token.
    async fn login(&self, request: &LoginRequest) -> Result<String>;
    async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse>;

    async fn get_user_profile(&self, session: &Session) -> Result<User>;
    async fn get_user_by_id(&self, session: &Session, id: &str) -> Result<User>;
    async fn update_profile(&self, session: &Session, update: &ProfileUpdate) -> Result<()>;

    async fn get_notifications(&self, session: &Session) -> Result<Vec<Notification>>;
    async fn register_push_token(&self, session: &Session, fcm_token: &str) -> Result<()>;
}

/// Durable whole-value key/value storage backing the read-through cache.
///
/// Values are opaque JSON documents; the store never interprets them.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    /// Overwrites any previous value for `key`.
    async fn put(&self, key: &str, value: &str) -> anyhow::Result<()>;
    async fn remove(&self, key: &str) -> anyhow::Result<()>;
}

/// Claims readable from a bearer token without contacting the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenClaims {
    pub subject: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenClaims {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// Reads token claims. Implementations do not verify signatures.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait TokenInspector: Send + Sync {
    fn claims(&self, token: &str) -> Option<TokenClaims>;
}

//! # Read-Through Cache
//!
//! Last-write-wins, whole-value cache for the collections the client shows
//! before a fresh copy arrives. No TTL, no merge, no versioning.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::traits::CacheStore;

/// Logical name of a cached value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub const THREADS: &'static str = "cached_threads";
    pub const USER_THREADS: &'static str = "cached_user_threads";
    pub const PROFILE: &'static str = "cached_profile";
    pub const NOTIFICATIONS: &'static str = "cached_notifications";
    pub const TOKEN: &'static str = "token";
    pub const FCM_TOKEN: &'static str = "fcm_token";

    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// `prefix:id`, e.g. `profile:42`.
    pub fn scoped(prefix: &str, id: &str) -> Self {
        Self(format!("{prefix}:{id}"))
    }

    pub fn threads() -> Self {
        Self::new(Self::THREADS)
    }

    pub fn user_threads() -> Self {
        Self::new(Self::USER_THREADS)
    }

    pub fn profile() -> Self {
        Self::new(Self::PROFILE)
    }

    pub fn notifications() -> Self {
        Self::new(Self::NOTIFICATIONS)
    }

    pub fn token() -> Self {
        Self::new(Self::TOKEN)
    }

    pub fn fcm_token() -> Self {
        Self::new(Self::FCM_TOKEN)
    }

    /// Every entity cache cleared on logout. The push token survives.
    pub fn session_scoped() -> Vec<CacheKey> {
        vec![
            Self::threads(),
            Self::user_threads(),
            Self::profile(),
            Self::notifications(),
            Self::token(),
        ]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Typed facade over a [`CacheStore`].
#[derive(Clone)]
pub struct ReadThroughCache {
    store: Arc<dyn CacheStore>,
}

impl ReadThroughCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Last persisted value for `key`, or `T::default()`.
    ///
    /// Never fails: unreadable or undecodable entries are logged and treated
    /// as absent.
    pub async fn load<T>(&self, key: &CacheKey) -> T
    where
        T: DeserializeOwned + Default,
    {
        match self.store.get(key.as_str()).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    debug!(%key, "cache hit");
                    value
                }
                Err(e) => {
                    warn!(%key, error = %e, "discarding undecodable cache entry");
                    T::default()
                }
            },
            Ok(None) => T::default(),
            Err(e) => {
                warn!(%key, error = %e, "cache read failed");
                T::default()
            }
        }
    }

    pub async fn save<T>(&self, key: &CacheKey, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let raw = serde_json::to_string(value).map_err(|e| AppError::Cache(e.to_string()))?;
        self.store
            .put(key.as_str(), &raw)
            .await
            .map_err(|e| AppError::Cache(e.to_string()))?;
        debug!(%key, bytes = raw.len(), "cache saved");
        Ok(())
    }

    pub async fn clear(&self, key: &CacheKey) -> Result<()> {
        self.store
            .remove(key.as_str())
            .await
            .map_err(|e| AppError::Cache(e.to_string()))
    }

    /// Clears every key, continuing past failures. Returns the first error.
    pub async fn clear_all(&self, keys: &[CacheKey]) -> Result<()> {
        let mut first_err = None;
        for key in keys {
            if let Err(e) = self.clear(key).await {
                warn!(%key, error = %e, "cache clear failed");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

/// Process-local [`CacheStore`]. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, String>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn put(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

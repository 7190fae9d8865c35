//! # EntityListStore
//!
//! One generic state holder for every cached list screen: the home feed, the
//! user's own threads, notifications... It serves the cached copy as soon as
//! it is opened and replaces it wholesale on each successful refresh.

use std::sync::Arc;

use cv_core::{CacheKey, ReadThroughCache, Result, Session, VoteHost, VoteSets, VoteTarget};
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::notice::Notices;
use crate::session::SessionHandle;

/// Remote fetch backing a store.
pub type FetchFn<T> = Arc<dyn Fn(Arc<Session>) -> BoxFuture<'static, Result<Vec<T>>> + Send + Sync>;

/// State that can carry a user-visible error message.
pub trait ErrorSlot {
    fn set_error(&mut self, message: Option<String>);
}

/// What the presentation layer renders for a list screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ListState<T> {
    pub items: Vec<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for ListState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            error: None,
        }
    }
}

impl<T> ErrorSlot for ListState<T> {
    fn set_error(&mut self, message: Option<String>) {
        self.error = message;
    }
}

impl<T> VoteHost for ListState<T>
where
    Vec<T>: VoteHost,
{
    fn votes_mut(&mut self, target: &VoteTarget) -> Option<&mut VoteSets> {
        self.items.votes_mut(target)
    }
}

pub struct EntityListStore<T> {
    name: &'static str,
    key: Option<CacheKey>,
    cache: ReadThroughCache,
    session: SessionHandle,
    notices: Notices,
    fetch: FetchFn<T>,
    state: Arc<watch::Sender<ListState<T>>>,
}

impl<T> EntityListStore<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Builds the store and seeds it from the cache (if `key` is set).
    /// No network traffic happens until [`refresh`](Self::refresh).
    pub async fn open(
        name: &'static str,
        key: Option<CacheKey>,
        cache: ReadThroughCache,
        session: SessionHandle,
        notices: Notices,
        fetch: FetchFn<T>,
    ) -> Self {
        let items: Vec<T> = match &key {
            Some(key) => cache.load(key).await,
            None => Vec::new(),
        };
        debug!(store = name, cached = items.len(), "store opened");
        let (state, _) = watch::channel(ListState {
            items,
            ..ListState::default()
        });
        let state = Arc::new(state);
        Self {
            name,
            key,
            cache,
            session,
            notices,
            fetch,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ListState<T>> {
        self.state.subscribe()
    }

    /// Underlying state channel, for controllers that mutate it in place.
    pub fn state(&self) -> &Arc<watch::Sender<ListState<T>>> {
        &self.state
    }

    pub fn snapshot(&self) -> ListState<T> {
        self.state.borrow().clone()
    }

    pub fn items(&self) -> Vec<T> {
        self.state.borrow().items.clone()
    }

    /// Fetches a fresh copy, replaces the list and persists it.
    ///
    /// On failure the stale list stays visible and the error is surfaced.
    pub async fn refresh(&self) -> Result<()> {
        self.refresh_with(|state, items| state.send_modify(|s| s.items = items))
            .await
    }

    /// Like [`refresh`](Self::refresh), but `install` puts the fetched items
    /// into the state channel. Used when other pending work must be folded
    /// into the fresh list in the same update.
    pub async fn refresh_with<F>(&self, install: F) -> Result<()>
    where
        F: FnOnce(&watch::Sender<ListState<T>>, Vec<T>),
    {
        let session = match self.session.require() {
            Ok(session) => session,
            Err(e) => {
                self.surface(&e);
                return Err(e);
            }
        };

        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });

        match (self.fetch)(session).await {
            Ok(items) => {
                if let Some(key) = &self.key {
                    if let Err(e) = self.cache.save(key, &items).await {
                        warn!(store = self.name, error = %e, "failed to persist refreshed list");
                    }
                }
                debug!(store = self.name, count = items.len(), "store refreshed");
                install(&self.state, items);
                self.state.send_if_modified(|s| std::mem::take(&mut s.loading));
                Ok(())
            }
            Err(e) => {
                warn!(store = self.name, error = %e, "refresh failed");
                self.surface(&e);
                Err(e)
            }
        }
    }

    /// Runs [`refresh`](Self::refresh) in the background. Failures are
    /// already surfaced through state and notices.
    pub fn spawn_refresh(self: &Arc<Self>) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let _ = store.refresh().await;
        })
    }

    pub async fn clear_cache(&self) -> Result<()> {
        match &self.key {
            Some(key) => self.cache.clear(key).await,
            None => Ok(()),
        }
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|s| s.error.take().is_some());
    }

    fn surface(&self, err: &cv_core::AppError) {
        let message = err.user_message();
        self.state.send_modify(|s| {
            s.loading = false;
            s.error = Some(message);
        });
        self.notices.error(err);
    }
}

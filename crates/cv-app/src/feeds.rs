//! Thread and notification feeds built on [`EntityListStore`].

use std::sync::Arc;

use cv_core::{
    AppError, CacheKey, Notification, Result, Session, Thread, ThreadApi, VoteDirection, VoteTarget,
};
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::watch;

use crate::enrich::enrich_threads;
use crate::store::{EntityListStore, FetchFn, ListState};
use crate::votes::{VoteController, VoteOutcome};
use crate::Services;

/// A votable list of threads: home, own threads, by tag, by author.
pub struct ThreadFeed {
    store: EntityListStore<Thread>,
    votes: Arc<VoteController>,
}

impl ThreadFeed {
    /// Home feed, cached under `cached_threads`.
    pub async fn home(services: &Services) -> Self {
        let fetch = enriched(services, |api, session| {
            async move { api.get_threads(&session).await }.boxed()
        });
        Self::open(services, "home", Some(CacheKey::threads()), fetch).await
    }

    /// The current user's threads, cached under `cached_user_threads`.
    pub async fn user_threads(services: &Services) -> Self {
        let fetch = enriched(services, |api, session| {
            async move {
                match session.user_id.clone() {
                    Some(user_id) => api.get_user_threads(&session, &user_id).await,
                    None => Err(AppError::missing_session()),
                }
            }
            .boxed()
        });
        Self::open(services, "user_threads", Some(CacheKey::user_threads()), fetch).await
    }

    /// Threads carrying `tag`. Not cached.
    pub async fn by_tag(services: &Services, tag: &str) -> Self {
        let tag = tag.trim().trim_start_matches('#').to_string();
        let fetch = enriched(services, move |api, session| {
            let tag = tag.clone();
            async move { api.get_threads_by_tag(&session, &tag).await }.boxed()
        });
        Self::open(services, "by_tag", None, fetch).await
    }

    /// Threads written by another user. Not cached.
    pub async fn by_author(services: &Services, author_id: &str) -> Self {
        let author_id = author_id.to_string();
        let fetch = enriched(services, move |api, session| {
            let author_id = author_id.clone();
            async move { api.get_user_threads(&session, &author_id).await }.boxed()
        });
        Self::open(services, "by_author", None, fetch).await
    }

    async fn open(
        services: &Services,
        name: &'static str,
        key: Option<CacheKey>,
        fetch: FetchFn<Thread>,
    ) -> Self {
        let store = EntityListStore::open(
            name,
            key,
            services.cache.clone(),
            services.session.clone(),
            services.notices.clone(),
            fetch,
        )
        .await;
        let votes = Arc::new(VoteController::new(
            services.threads.clone(),
            services.session.clone(),
            services.notices.clone(),
        ));
        Self { store, votes }
    }

    pub fn store(&self) -> &EntityListStore<Thread> {
        &self.store
    }

    pub fn subscribe(&self) -> watch::Receiver<ListState<Thread>> {
        self.store.subscribe()
    }

    pub fn threads(&self) -> Vec<Thread> {
        self.store.items()
    }

    /// Refreshes the list, keeping votes still in flight applied on top of
    /// the fresh copy.
    pub async fn refresh(&self) -> Result<()> {
        self.store
            .refresh_with(|state, items| {
                self.votes.rebase(state, move |s: &mut ListState<Thread>| s.items = items)
            })
            .await
    }

    pub async fn vote(&self, thread_id: &str, direction: VoteDirection) -> Result<VoteOutcome> {
        self.votes
            .vote(self.store.state(), VoteTarget::thread(thread_id), direction)
            .await
    }
}

/// The notification list. Not votable.
pub type NotificationFeed = EntityListStore<Notification>;

/// Notifications, cached under `cached_notifications`.
pub async fn notifications(services: &Services) -> NotificationFeed {
    let users = services.users.clone();
    let fetch: FetchFn<Notification> = Arc::new(move |session: Arc<Session>| {
        let users = users.clone();
        async move { users.get_notifications(&session).await }.boxed()
    });
    EntityListStore::open(
        "notifications",
        Some(CacheKey::notifications()),
        services.cache.clone(),
        services.session.clone(),
        services.notices.clone(),
        fetch,
    )
    .await
}

/// Wraps a thread listing so its results come back with author info.
fn enriched<F>(services: &Services, list: F) -> FetchFn<Thread>
where
    F: Fn(Arc<dyn ThreadApi>, Arc<Session>) -> BoxFuture<'static, Result<Vec<Thread>>>
        + Send
        + Sync
        + 'static,
{
    let threads = services.threads.clone();
    let users = services.users.clone();
    Arc::new(move |session: Arc<Session>| {
        let listing = list(threads.clone(), session.clone());
        let users = users.clone();
        async move {
            let found = listing.await?;
            Ok::<_, AppError>(enrich_threads(users.as_ref(), &session, found).await)
        }
        .boxed()
    })
}

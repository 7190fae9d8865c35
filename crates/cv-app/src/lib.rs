//! State holders for the campvoice client.
//!
//! Every screen-level holder is built from one [`Services`] bundle: the two
//! remote ports, the read-through cache, the shared session and the notice
//! channel. Holders publish their state through `tokio::sync::watch` so any
//! front end can observe them.

pub mod auth;
pub mod compose;
pub mod enrich;
pub mod feeds;
pub mod notice;
pub mod profile;
pub mod session;
pub mod store;
pub mod thread_detail;
pub mod voters;
pub mod votes;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use cv_core::{ReadThroughCache, ThreadApi, UserApi};

pub use auth::SessionManager;
pub use compose::{normalize_tags, parse_tags, submit_thread, MAX_ATTACHMENT_BYTES};
pub use feeds::{notifications, NotificationFeed, ThreadFeed};
pub use notice::{Notice, Notices};
pub use profile::ProfileStore;
pub use session::SessionHandle;
pub use store::{EntityListStore, ErrorSlot, FetchFn, ListState};
pub use thread_detail::{ThreadDetailState, ThreadDetailStore};
pub use voters::resolve_voters;
pub use votes::{VoteController, VoteOutcome};

/// Dependencies shared by every state holder.
#[derive(Clone)]
pub struct Services {
    pub threads: Arc<dyn ThreadApi>,
    pub users: Arc<dyn UserApi>,
    pub cache: ReadThroughCache,
    pub session: SessionHandle,
    pub notices: Notices,
}

impl Services {
    pub fn new(threads: Arc<dyn ThreadApi>, users: Arc<dyn UserApi>, cache: ReadThroughCache) -> Self {
        Self {
            threads,
            users,
            cache,
            session: SessionHandle::new(),
            notices: Notices::default(),
        }
    }
}

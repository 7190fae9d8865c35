//! Author enrichment: the backend only sends author ids, the screens show
//! names and avatars.

use std::collections::{BTreeSet, HashMap};

use cv_core::{AuthorInfo, Session, Thread, UserApi};
use futures::future::join_all;
use tracing::debug;

/// Looks up each distinct id once, concurrently. Failed lookups are skipped.
pub async fn lookup_authors(
    users: &dyn UserApi,
    session: &Session,
    ids: BTreeSet<String>,
) -> HashMap<String, AuthorInfo> {
    let lookups = ids.into_iter().map(|id| async move {
        let result = users.get_user_by_id(session, &id).await;
        (id, result)
    });

    join_all(lookups)
        .await
        .into_iter()
        .filter_map(|(id, result)| match result {
            Ok(user) => Some((id, AuthorInfo::from(&user))),
            Err(e) => {
                debug!(author = %id, error = %e, "author lookup failed");
                None
            }
        })
        .collect()
}

/// Fills author display fields on every thread whose author could be found.
pub async fn enrich_threads(users: &dyn UserApi, session: &Session, threads: Vec<Thread>) -> Vec<Thread> {
    let ids = threads.iter().map(|t| t.author_id.clone()).collect();
    let authors = lookup_authors(users, session, ids).await;
    threads
        .into_iter()
        .map(|t| match authors.get(&t.author_id) {
            Some(author) => t.with_author(author),
            None => t,
        })
        .collect()
}

/// Same as [`enrich_threads`] for the comments of one thread, plus its author.
pub async fn enrich_thread_detail(users: &dyn UserApi, session: &Session, mut thread: Thread) -> Thread {
    let mut ids: BTreeSet<String> = thread.comments.iter().map(|c| c.user_id.clone()).collect();
    ids.insert(thread.author_id.clone());
    let authors = lookup_authors(users, session, ids).await;

    thread.comments = std::mem::take(&mut thread.comments)
        .into_iter()
        .map(|c| match authors.get(&c.user_id) {
            Some(author) => c.with_author(author),
            None => c,
        })
        .collect();
    match authors.get(&thread.author_id) {
        Some(author) => thread.with_author(author),
        None => thread,
    }
}

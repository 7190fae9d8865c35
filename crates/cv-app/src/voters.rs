//! Voter lists: the up and down voters of a thread or comment, resolved from
//! user ids into name and username entries for display.

use cv_core::{Result, Voter};
use futures::future::join_all;
use tracing::debug;

use crate::Services;

/// Resolves voter ids to display entries, concurrently. Ids that fail to
/// resolve are skipped; the order of the rest is kept.
pub async fn resolve_voters(services: &Services, user_ids: &[String]) -> Result<Vec<Voter>> {
    let session = services.session.require()?;
    let users = services.users.as_ref();
    let session = session.as_ref();

    let lookups = user_ids.iter().map(|id| async move {
        users.get_user_by_id(session, id).await.map_err(|e| {
            debug!(voter = %id, error = %e, "voter lookup failed");
            e
        })
    });

    Ok(join_all(lookups)
        .await
        .into_iter()
        .filter_map(|r| r.ok())
        .map(Voter::from)
        .collect())
}

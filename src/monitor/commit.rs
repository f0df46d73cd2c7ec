//! Recognizes genuine new local commits among raw filesystem events and
//! performs the amend side effect that folds the accumulated work time into
//! the commit itself.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::{git::Git, utils::time::format_hms};

use super::repository::{Repository, WorklogEntry};

/// Reconstructs a 40-character object id from a path relative to a repository
/// root, if it matches the loose-object layout
/// `.git/objects/<2 hex>/<38 hex>`.
pub(crate) fn loose_object_id(rel: &Path) -> Option<String> {
    let mut components = rel
        .components()
        .map(|component| component.as_os_str().to_str());
    if components.next()? != Some(".git") || components.next()? != Some("objects") {
        return None;
    }
    let prefix = components.next()??;
    let rest = components.next()??;
    if components.next().is_some() {
        return None;
    }
    if prefix.len() != 2 || rest.len() != 38 {
        return None;
    }
    if !prefix.chars().chain(rest.chars()).all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(format!("{prefix}{rest}"))
}

/// Applies the guards that separate a freshly authored local commit from
/// noise: blob/tree churn, objects that are not the branch tip, the monitor's
/// own previous amendment, and commits that landed via fetch/pull.
pub(crate) async fn is_new_local_commit<G: Git>(
    repo: &Repository,
    git: &G,
    object_id: &str,
) -> bool {
    if !git.object_is_commit(&repo.basedir, object_id).await {
        return false;
    }
    if repo.last_logged_commit.as_deref() == Some(object_id) {
        debug!("Object {object_id} is our own amendment, ignoring");
        return false;
    }
    if git.head_commit(&repo.basedir).await.as_deref() != Some(object_id) {
        debug!("Commit {object_id} is not the branch tip, ignoring");
        return false;
    }
    if git.fetch_head(&repo.basedir).await.as_deref() == Some(object_id) {
        debug!("Commit {object_id} arrived via fetch, ignoring");
        return false;
    }
    true
}

/// Folds `seconds` of work into the tip commit: appends a work log entry,
/// stages it, amends the commit in place and remembers the resulting object
/// id so its own loose object does not re-trigger detection.
///
/// The caller has already snapshotted the work time and cleared the activity
/// log; a failure in here loses at most that one period.
pub(crate) async fn amend_with_worklog<G: Git>(
    repo: &mut Repository,
    git: &G,
    seconds: f64,
) -> Result<()> {
    let entry = WorklogEntry {
        author: git.head_author(&repo.basedir).await.unwrap_or_default(),
        duration: format_hms(seconds),
        summary: git.head_summary(&repo.basedir).await.unwrap_or_default(),
    };
    repo.append_worklog(&entry).await?;

    git.stage(&repo.basedir, Path::new(super::repository::WORKLOG_FILE))
        .await?;
    git.amend_head(&repo.basedir).await?;

    let amended = git
        .head_commit(&repo.basedir)
        .await
        .context("No tip commit after amending")?;
    repo.last_logged_commit = Some(amended);
    Ok(())
}

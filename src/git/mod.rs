//! Plumbing access to the version-control tool. Everything goes through the
//! [Git] trait so commit detection can be exercised in tests without spawning
//! real subprocesses.

use std::path::Path;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Git: Send + Sync {
    /// Whether `object_id` names a commit in `repo`. Garbage or unknown ids
    /// answer false rather than failing.
    async fn object_is_commit(&self, repo: &Path, object_id: &str) -> bool;

    /// Current branch tip, if the repository has any commit at all.
    async fn head_commit(&self, repo: &Path) -> Option<String>;

    /// Author of the tip commit as `Name <email>`.
    async fn head_author(&self, repo: &Path) -> Option<String>;

    /// One-line summary of the tip commit.
    async fn head_summary(&self, repo: &Path) -> Option<String>;

    /// Object id recorded by the most recent fetch, if a fetch marker exists.
    async fn fetch_head(&self, repo: &Path) -> Option<String>;

    /// Stages `file` (relative to the repository root).
    async fn stage(&self, repo: &Path, file: &Path) -> Result<()>;

    /// Amends the tip commit in place, non-interactively, preserving author
    /// and message.
    async fn amend_head(&self, repo: &Path) -> Result<()>;
}

/// [Git] implementation backed by the `git` binary.
pub struct GitCli;

impl GitCli {
    async fn query(&self, repo: &Path, args: &[&str]) -> Option<String> {
        Command::new("git")
            .current_dir(repo)
            .args(args)
            .output()
            .await
            .ok()
            .filter(|output| output.status.success())
            .and_then(|output| String::from_utf8(output.stdout).ok())
    }

    async fn execute(&self, repo: &Path, args: &[&str]) -> Result<()> {
        let output = Command::new("git")
            .current_dir(repo)
            .args(args)
            .output()
            .await?;
        if !output.status.success() {
            bail!(
                "git {} failed in {:?}: {}",
                args.join(" "),
                repo,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

#[async_trait]
impl Git for GitCli {
    async fn object_is_commit(&self, repo: &Path, object_id: &str) -> bool {
        self.query(repo, &["cat-file", "-t", object_id])
            .await
            .map(|kind| kind.trim() == "commit")
            .unwrap_or(false)
    }

    async fn head_commit(&self, repo: &Path) -> Option<String> {
        self.query(repo, &["rev-parse", "HEAD"])
            .await
            .map(|id| id.trim().to_string())
    }

    async fn head_author(&self, repo: &Path) -> Option<String> {
        self.query(repo, &["log", "-1", "--pretty=format:%an <%ae>"])
            .await
            .map(|author| author.trim().to_string())
    }

    async fn head_summary(&self, repo: &Path) -> Option<String> {
        self.query(repo, &["log", "-1", "--pretty=format:%s"])
            .await
            .map(|summary| summary.trim().to_string())
    }

    async fn fetch_head(&self, repo: &Path) -> Option<String> {
        let marker = repo.join(".git").join("FETCH_HEAD");
        let content = match tokio::fs::read_to_string(&marker).await {
            Ok(content) => content,
            Err(e) => {
                debug!("No fetch marker at {marker:?}: {e}");
                return None;
            }
        };
        content
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().next())
            .map(str::to_string)
    }

    async fn stage(&self, repo: &Path, file: &Path) -> Result<()> {
        let file = file.to_string_lossy();
        self.execute(repo, &["add", "--", &file]).await
    }

    async fn amend_head(&self, repo: &Path) -> Result<()> {
        self.execute(repo, &["commit", "--amend", "--no-edit", "--no-verify"])
            .await
    }
}

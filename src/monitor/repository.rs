use std::path::{Path, PathBuf};

use anyhow::Result;
use tokio::io::AsyncWriteExt;

use super::{activity_log::ActivityLog, session};

/// Path of the tracked work log inside a repository, relative to its root.
/// Unlike the activity log this file is committed, so logged work time is
/// carried permanently in the repository history.
pub const WORKLOG_FILE: &str = "meta/worklog";

/// One entry of the tracked work log: who worked, for how long, on what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorklogEntry {
    pub author: String,
    /// Already formatted as `HH:MM:SS`.
    pub duration: String,
    pub summary: String,
}

/// A single watched git working tree.
pub struct Repository {
    pub name: String,
    pub basedir: PathBuf,
    log: ActivityLog,
    /// Most recent commit this monitor has amended-and-logged itself. The
    /// amendment writes a fresh loose object, which arrives back through the
    /// watch queue; matching it against this id is what breaks the loop.
    pub(crate) last_logged_commit: Option<String>,
}

impl Repository {
    pub fn new(basedir: PathBuf) -> Self {
        let name = basedir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let log = ActivityLog::new(&basedir);
        Self {
            name,
            basedir,
            log,
            last_logged_commit: None,
        }
    }

    /// Records a moment of developer activity.
    pub async fn notify(&self, now: f64) -> Result<()> {
        self.log.append(now).await
    }

    pub async fn read_log(&self) -> Result<Vec<f64>> {
        self.log.read().await
    }

    pub async fn clear(&self) -> Result<()> {
        self.log.clear().await
    }

    /// Total active seconds accumulated in the current log.
    pub async fn active_time(&self, heartbeat: f64) -> Result<f64> {
        Ok(session::active_seconds(&self.read_log().await?, heartbeat))
    }

    pub fn worklog_path(&self) -> PathBuf {
        self.basedir.join(WORKLOG_FILE)
    }

    /// Appends an entry to the tracked work log, creating the containing
    /// directory on first use. Earlier entries are never rewritten.
    pub async fn append_worklog(&self, entry: &WorklogEntry) -> Result<()> {
        let path = self.worklog_path();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::options()
            .append(true)
            .create(true)
            .open(&path)
            .await?;
        let block = format!("{}\n{}\n{}\n\n", entry.author, entry.duration, entry.summary);
        file.write_all(block.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Whether `path` is a directory containing a git repository.
pub fn is_repository(path: &Path) -> bool {
    path.join(".git").is_dir()
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use super::{Repository, WorklogEntry};

    #[tokio::test]
    async fn name_is_the_last_path_segment() -> Result<()> {
        let dir = tempdir()?;
        let base = dir.path().join("myproject");
        tokio::fs::create_dir(&base).await?;
        let repo = Repository::new(base);
        assert_eq!(repo.name, "myproject");
        Ok(())
    }

    #[tokio::test]
    async fn active_time_follows_the_log() -> Result<()> {
        let dir = tempdir()?;
        let repo = Repository::new(dir.path().to_path_buf());
        repo.notify(1_000_000_000.0).await?;
        repo.notify(1_000_000_060.0).await?;
        assert_eq!(repo.active_time(70.0).await?, 60.0);
        assert_eq!(repo.active_time(70.0).await?, 60.0);

        repo.clear().await?;
        assert_eq!(repo.active_time(70.0).await?, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn worklog_entries_accumulate() -> Result<()> {
        let dir = tempdir()?;
        let repo = Repository::new(dir.path().to_path_buf());

        repo.append_worklog(&WorklogEntry {
            author: "Tester <tester@example.com>".into(),
            duration: "00:02:00".into(),
            summary: "Test Message".into(),
        })
        .await?;
        repo.append_worklog(&WorklogEntry {
            author: "Tester <tester@example.com>".into(),
            duration: "00:01:00".into(),
            summary: "Yet another message".into(),
        })
        .await?;

        let content = tokio::fs::read_to_string(repo.worklog_path()).await?;
        let lines: Vec<&str> = content.lines().collect();
        assert!(lines.contains(&"Tester <tester@example.com>"));
        assert!(lines.contains(&"00:02:00"));
        assert!(lines.contains(&"Test Message"));

        let second_half = &lines[lines.len() / 2..];
        assert!(second_half.contains(&"Yet another message"));
        assert!(second_half.contains(&"00:01:00"));
        Ok(())
    }

    #[tokio::test]
    async fn worklog_accepts_non_ascii_summaries() -> Result<()> {
        let dir = tempdir()?;
        let repo = Repository::new(dir.path().to_path_buf());
        repo.append_worklog(&WorklogEntry {
            author: "Testeur <testeur@example.com>".into(),
            duration: "00:00:30".into(),
            summary: "Ajout de la fonctionnalité éphémère".into(),
        })
        .await?;
        let content = tokio::fs::read_to_string(repo.worklog_path()).await?;
        assert!(content.contains("Ajout de la fonctionnalité éphémère"));
        Ok(())
    }
}

//! Durable per-repository activity log: one fractional Unix timestamp per
//! line, append-only, truncated once per logged commit. The log is keyed by
//! its on-disk location, so independent monitor processes watching the same
//! base directory observe the same log. File locks guard against interleaved
//! appends from such processes.

use std::{io::ErrorKind, path::PathBuf};

use anyhow::Result;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
};
use tracing::warn;

/// File name of the activity log inside a repository working tree. Kept out
/// of version control; the path resolver filters it out of event processing
/// so the monitor never observes its own writes as developer activity.
pub const ACTIVITY_LOG_FILE: &str = ".worklog";

pub struct ActivityLog {
    path: PathBuf,
}

impl ActivityLog {
    pub fn new(repo_dir: &std::path::Path) -> Self {
        Self {
            path: repo_dir.join(ACTIVITY_LOG_FILE),
        }
    }

    /// Appends a single timestamp. Durable before returning.
    pub async fn append(&self, timestamp: f64) -> Result<()> {
        let mut file = File::options()
            .append(true)
            .create(true)
            .open(&self.path)
            .await?;
        file.lock_exclusive()?;
        let result = async {
            file.write_all(format!("{timestamp:.6}\n").as_bytes())
                .await?;
            file.flush().await
        }
        .await;
        file.unlock_async().await?;
        result?;
        Ok(())
    }

    /// Reads the full log in recorded order. A log that does not exist yet is
    /// an empty log, not an error; a line that fails to parse is skipped.
    pub async fn read(&self) -> Result<Vec<f64>> {
        let file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };
        file.lock_shared()?;
        let buffer = BufReader::new(file);
        let mut lines = buffer.lines();
        let mut timestamps = vec![];
        while let Ok(Some(line)) = lines.next_line().await {
            match line.trim().parse::<f64>() {
                Ok(timestamp) => timestamps.push(timestamp),
                Err(e) => {
                    // Might happen after a shutdown cut a write short.
                    warn!("Illegal line in activity log {:?}: {e}", self.path)
                }
            }
        }
        lines.into_inner().into_inner().unlock_async().await?;
        Ok(timestamps)
    }

    /// Truncates the log to empty.
    pub async fn clear(&self) -> Result<()> {
        File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .await?;
        Ok(())
    }
}

use std::path::PathBuf;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::{git::GitCli, utils::clock::DefaultClock};

use self::repo_set::RepositorySet;

pub mod activity_log;
pub mod commit;
pub mod repo_set;
pub mod repository;
pub mod session;
pub mod shutdown;

/// Default maximum gap, in seconds, between two activity events that still
/// belong to the same active session.
pub const DEFAULT_HEARTBEAT_SECONDS: u64 = 300;

/// Represents the starting point for the monitor process.
pub async fn start_monitor(basedir: PathBuf, heartbeat: f64) -> Result<()> {
    let shutdown_token = CancellationToken::new();

    let set = RepositorySet::new(
        basedir,
        GitCli,
        Box::new(DefaultClock),
        heartbeat,
        shutdown_token.clone(),
    )
    .await?;

    let (_, run_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token),
        set.run(),
    );

    if let Err(run_result) = run_result {
        error!("Monitor loop got an error {:?}", run_result);
    }

    Ok(())
}

#[cfg(test)]
mod monitor_tests {
    use std::fs;

    use anyhow::Result;
    use tempfile::tempdir;
    use tokio_util::sync::CancellationToken;

    use crate::{
        git::MockGit,
        monitor::repo_set::{RepositorySet, IDLE_STATUS},
        utils::logging::TEST_LOGGING,
    };

    use super::repo_set::tests::ManualClock;

    const T: f64 = 1_000_000_000.0;

    fn quiet_git() -> MockGit {
        let mut git = MockGit::new();
        git.expect_head_commit().returning(|_| None);
        git
    }

    /// End to end over a real watcher: edits picked up from disk, idle
    /// transition once the clock moves past the heartbeat.
    #[tokio::test]
    async fn smoke_test_monitor() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let base = dir.path().canonicalize()?;
        let repo = base.join("testrepo");
        fs::create_dir_all(repo.join(".git"))?;

        let clock = ManualClock::at(T);
        let mut set = RepositorySet::new(
            base,
            quiet_git(),
            Box::new(clock.clone()),
            300.0,
            CancellationToken::new(),
        )
        .await?;
        assert_eq!(set.status(), IDLE_STATUS);

        fs::write(repo.join("asdf"), "hello")?;
        set.check().await;
        assert_eq!(set.status(), "Working on testrepo");
        assert!(!set.repository("testrepo").unwrap().read_log().await?.is_empty());

        clock.set(T + 301.0);
        set.check().await;
        assert_eq!(set.status(), IDLE_STATUS);
        Ok(())
    }

    #[tokio::test]
    async fn new_directories_are_monitored() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let base = dir.path().canonicalize()?;
        let repo = base.join("testrepo");
        fs::create_dir_all(repo.join(".git"))?;

        let mut set = RepositorySet::new(
            base,
            quiet_git(),
            Box::new(ManualClock::at(T)),
            300.0,
            CancellationToken::new(),
        )
        .await?;

        fs::create_dir(repo.join("testdir"))?;
        set.check().await;
        set.repository("testrepo").unwrap().clear().await?;

        fs::write(repo.join("testdir").join("asdf"), "hello")?;
        set.check().await;
        assert!(!set.repository("testrepo").unwrap().read_log().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn instantly_removed_directory_is_absorbed() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let base = dir.path().canonicalize()?;
        let repo = base.join("testrepo");
        fs::create_dir_all(repo.join(".git"))?;

        let mut set = RepositorySet::new(
            base,
            quiet_git(),
            Box::new(ManualClock::at(T)),
            300.0,
            CancellationToken::new(),
        )
        .await?;

        fs::create_dir(repo.join("testdir"))?;
        fs::remove_dir(repo.join("testdir"))?;
        set.check().await;
        set.check().await;
        Ok(())
    }

    #[tokio::test]
    async fn run_loop_exits_on_cancellation() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let base = dir.path().canonicalize()?;
        fs::create_dir_all(base.join("testrepo").join(".git"))?;

        let shutdown_token = CancellationToken::new();
        let set = RepositorySet::new(
            base,
            quiet_git(),
            Box::new(ManualClock::at(T)),
            300.0,
            shutdown_token.clone(),
        )
        .await?;

        let handle = tokio::spawn(set.run());
        shutdown_token.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle).await???;
        Ok(())
    }
}

//! Coordinator owning all tracked repositories, the watch registrations and
//! the externally visible status string.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    git::Git,
    utils::{clock::Clock, time::format_hms},
    watch::{FsEvent, FsEventKind, WatchRegistrar},
};

use super::{
    activity_log::ACTIVITY_LOG_FILE,
    commit,
    repository::{is_repository, Repository, WORKLOG_FILE},
};

pub const IDLE_STATUS: &str = "IDLE";

/// Bounded wait for the first event of a check pass. Finite so that idle
/// transitions happen even when nothing changes on disk.
const FIRST_WAIT: Duration = Duration::from_millis(250);
/// Shorter wait used while draining, long enough to pick up the synthesized
/// events a mid-drain directory registration produces.
const SETTLE_WAIT: Duration = Duration::from_millis(50);

pub struct RepositorySet<G> {
    basedir: PathBuf,
    repositories: BTreeMap<String, Repository>,
    registrar: WatchRegistrar,
    events: mpsc::Receiver<FsEvent>,
    git: G,
    clock: Box<dyn Clock>,
    heartbeat: f64,
    status: String,
    last_activity: Option<DateTime<Utc>>,
    shutdown: CancellationToken,
}

impl<G: Git> RepositorySet<G> {
    /// Scans the direct subdirectories of `basedir` for git repositories and
    /// installs watches over the whole tree. Repositories appearing after
    /// this scan are not picked up.
    pub async fn new(
        basedir: PathBuf,
        git: G,
        clock: Box<dyn Clock>,
        heartbeat: f64,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let basedir = basedir
            .canonicalize()
            .with_context(|| format!("Base directory {basedir:?} is not accessible"))?;

        let (mut registrar, events) = WatchRegistrar::new()?;

        let mut repositories = BTreeMap::new();
        for entry in std::fs::read_dir(&basedir)?.flatten() {
            let path = entry.path();
            if !is_repository(&path) {
                continue;
            }
            let mut repository = Repository::new(path);
            // Seed with the scan-time tip so pre-existing history never
            // triggers a startup amendment.
            repository.last_logged_commit = git.head_commit(&repository.basedir).await;
            info!("Tracking repository {}", repository.name);
            repositories.insert(repository.name.clone(), repository);
        }

        registrar.register_tree(&basedir);

        Ok(Self {
            basedir,
            repositories,
            registrar,
            events,
            git,
            clock,
            heartbeat,
            status: IDLE_STATUS.into(),
            last_activity: None,
            shutdown,
        })
    }

    /// Human-readable state: the idle marker, `Working on <name>`, or
    /// `<name> HH:MM:SS` right after a commit was logged.
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn repository(&self, name: &str) -> Option<&Repository> {
        self.repositories.get(name)
    }

    pub fn repository_names(&self) -> impl Iterator<Item = &str> {
        self.repositories.keys().map(String::as_str)
    }

    /// Maps a filesystem path to the owning repository name and the path
    /// remainder inside it. Misses and the activity log's own file resolve to
    /// nothing.
    fn resolve(&self, path: &Path) -> Option<(String, PathBuf)> {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let rel = canonical.strip_prefix(&self.basedir).ok()?;
        if rel
            .file_name()
            .map(|name| name == ACTIVITY_LOG_FILE)
            .unwrap_or(false)
        {
            return None;
        }
        let mut components = rel.components();
        let name = components.next()?.as_os_str().to_str()?.to_string();
        if !self.repositories.contains_key(&name) {
            return None;
        }
        Some((name, components.as_path().to_path_buf()))
    }

    /// Processes one resolved filesystem event: activity accounting for
    /// working-tree paths, commit detection for loose objects under `.git`.
    pub(crate) async fn notify(&mut self, path: &Path, kind: FsEventKind) -> Result<()> {
        let Some((name, rel)) = self.resolve(path) else {
            return Ok(());
        };

        if rel.starts_with(".git") {
            // Internal churn is not developer activity, but a fresh loose
            // object may be a new commit.
            if kind == FsEventKind::Created {
                if let Some(object_id) = commit::loose_object_id(&rel) {
                    self.detect_commit(&name, &object_id).await?;
                }
            }
            return Ok(());
        }

        // The tracked work log (and its containing directory) is written by
        // the monitor itself on every logged commit.
        let worklog = Path::new(WORKLOG_FILE);
        if worklog.starts_with(&rel) || rel.starts_with(worklog) {
            return Ok(());
        }

        let Some(repository) = self.repositories.get(&name) else {
            return Ok(());
        };
        repository.notify(self.clock.unix_time()).await?;
        self.last_activity = Some(self.clock.time());
        self.status = format!("Working on {name}");
        Ok(())
    }

    /// Runs the guard chain on a candidate object and, for a genuine new
    /// local commit, logs the accumulated work time and amends the commit.
    async fn detect_commit(&mut self, name: &str, object_id: &str) -> Result<()> {
        let Some(repository) = self.repositories.get_mut(name) else {
            return Ok(());
        };
        if !commit::is_new_local_commit(repository, &self.git, object_id).await {
            return Ok(());
        }

        // Snapshot first, clear second. Anything notified after the snapshot
        // belongs to the next accounting period; a failure past this point
        // loses at most this one period.
        let seconds = repository.active_time(self.heartbeat).await?;
        repository.clear().await?;

        let duration = format_hms(seconds);
        info!("Logging {duration} of work on {name}");
        self.status = format!("{name} {duration}");

        commit::amend_with_worklog(repository, &self.git, seconds).await
    }

    async fn handle_event(&mut self, event: FsEvent) {
        debug!("Filesystem event {event:?}");
        if event.kind == FsEventKind::Created && event.path.is_dir() {
            self.registrar.register_directory(&event.path);
        }
        if let Err(e) = self.notify(&event.path, event.kind).await {
            error!("Error processing event for {:?}: {e:?}", event.path);
        }
    }

    /// Drains pending filesystem events with a bounded wait, then applies the
    /// idle transition if nothing has happened for longer than the heartbeat.
    pub async fn check(&mut self) {
        let mut wait = FIRST_WAIT;
        while let Ok(Some(event)) = tokio::time::timeout(wait, self.events.recv()).await {
            self.handle_event(event).await;
            wait = SETTLE_WAIT;
        }

        if let Some(last) = self.last_activity {
            let quiet = (self.clock.time() - last).num_milliseconds() as f64 / 1000.0;
            if quiet > self.heartbeat && self.status != IDLE_STATUS {
                info!("No activity for {quiet:.0}s, going idle");
                self.status = IDLE_STATUS.into();
            }
        }
    }

    /// The process main loop. Cancellation is observed once per iteration;
    /// `check` itself never blocks indefinitely.
    pub async fn run(mut self) -> Result<()> {
        loop {
            self.check().await;
            if self.shutdown.is_cancelled() {
                return Ok(());
            }
        }
    }
}

//! Filesystem watch registration. Watches are installed one directory at a
//! time (non-recursive) so that a directory discovered mid-run can replay its
//! existing contents as synthesized created-events, keeping entries that were
//! present before the watch indistinguishable from ones created after it.

use std::path::{Path, PathBuf};

use anyhow::Result;
use notify::{
    event::{AccessKind, AccessMode, EventKind, ModifyKind, RenameMode},
    Config, Event, RecommendedWatcher, RecursiveMode, Watcher,
};
use tokio::sync::mpsc;
use tracing::{debug, warn};

const EVENT_CAPACITY: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEventKind {
    Created,
    Removed,
    /// File content was written and closed (falls back to data-modify on
    /// platforms without a close-write notification).
    Written,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub kind: FsEventKind,
    pub path: PathBuf,
}

/// Flattens a backend event into per-path events. A rename counts as a
/// removal of the source and a creation of the destination; git materializes
/// loose objects by renaming a temporary file into place, so rename
/// destinations must be indistinguishable from plain creations.
fn translate(event: Event) -> Vec<FsEvent> {
    let kinds: Vec<FsEventKind> = match event.kind {
        EventKind::Create(_) => vec![FsEventKind::Created; event.paths.len()],
        EventKind::Remove(_) => vec![FsEventKind::Removed; event.paths.len()],
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => {
            vec![FsEventKind::Written; event.paths.len()]
        }
        EventKind::Modify(ModifyKind::Data(_)) => vec![FsEventKind::Written; event.paths.len()],
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            vec![FsEventKind::Removed; event.paths.len()]
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
            vec![FsEventKind::Removed, FsEventKind::Created]
        }
        EventKind::Modify(ModifyKind::Name(_)) => vec![FsEventKind::Created; event.paths.len()],
        _ => return vec![],
    };
    kinds
        .into_iter()
        .zip(event.paths)
        .map(|(kind, path)| FsEvent { kind, path })
        .collect()
}

pub struct WatchRegistrar {
    watcher: RecommendedWatcher,
    events: mpsc::Sender<FsEvent>,
}

impl WatchRegistrar {
    pub fn new() -> Result<(Self, mpsc::Receiver<FsEvent>)> {
        let (sender, receiver) = mpsc::channel(EVENT_CAPACITY);

        let callback_sender = sender.clone();
        let watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let event = match result {
                    Ok(event) => event,
                    Err(e) => {
                        debug!("Watch backend error {e}");
                        return;
                    }
                };
                for event in translate(event) {
                    if callback_sender.try_send(event).is_err() {
                        warn!("Event queue full, dropping a filesystem event");
                    }
                }
            },
            Config::default(),
        )?;

        Ok((
            Self {
                watcher,
                events: sender,
            },
            receiver,
        ))
    }

    /// Installs watches on `path` and every directory below it. No events are
    /// synthesized: the initial tree is considered quiescent until something
    /// actually changes.
    pub fn register_tree(&mut self, path: &Path) {
        let mut pending = vec![path.to_path_buf()];
        while let Some(dir) = pending.pop() {
            if let Err(e) = self.watcher.watch(&dir, RecursiveMode::NonRecursive) {
                debug!("Skipping watch on {dir:?}: {e}");
                continue;
            }
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    debug!("Skipping listing of {dir:?}: {e}");
                    continue;
                }
            };
            for entry in entries.flatten() {
                let entry_path = entry.path();
                if entry_path.is_dir() {
                    pending.push(entry_path);
                }
            }
        }
    }

    /// Installs a watch on a directory discovered mid-run and synthesizes a
    /// created-event for each entry already inside it. Files that landed
    /// before the watch count as activity, and subdirectories get registered
    /// in turn when their synthesized events are processed. A directory that
    /// vanished between discovery and registration is a race, not an error.
    pub fn register_directory(&mut self, path: &Path) {
        if let Err(e) = self.watcher.watch(path, RecursiveMode::NonRecursive) {
            debug!("Directory {path:?} disappeared before watching: {e}");
            return;
        }
        let entries = match std::fs::read_dir(path) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Directory {path:?} disappeared before listing: {e}");
                return;
            }
        };
        for entry in entries.flatten() {
            let event = FsEvent {
                kind: FsEventKind::Created,
                path: entry.path(),
            };
            if self.events.try_send(event).is_err() {
                warn!("Event queue full, dropping a synthesized event");
            }
        }
    }
}

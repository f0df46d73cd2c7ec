use std::{env, path::PathBuf};

use anyhow::{Context, Result};

const APPLICATION_DIR: &str = "worktally";

/// State directory for log output, created on first use. Follows `APPDATA`
/// on Windows and `XDG_STATE_HOME` (with the usual `~/.local/state`
/// fallback) elsewhere.
pub fn create_application_default_path() -> Result<PathBuf> {
    let base = application_base_path()?;
    let path = base.join(APPLICATION_DIR);
    std::fs::create_dir_all(&path)
        .with_context(|| format!("Couldn't create application directory {path:?}"))?;
    Ok(path)
}

#[cfg(windows)]
fn application_base_path() -> Result<PathBuf> {
    env::var("APPDATA")
        .map(PathBuf::from)
        .context("APPDATA should be present on Windows")
}

#[cfg(not(windows))]
fn application_base_path() -> Result<PathBuf> {
    if let Ok(state) = env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(state));
    }
    let home = env::var("HOME").context("Couldn't find neither XDG_STATE_HOME nor HOME")?;
    Ok(PathBuf::from(home).join(".local/state"))
}

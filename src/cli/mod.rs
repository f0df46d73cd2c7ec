use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing::level_filters::LevelFilter;

use crate::{
    monitor::{start_monitor, DEFAULT_HEARTBEAT_SECONDS},
    utils::{
        dir::create_application_default_path,
        logging::{enable_logging, MONITOR_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "worktally", version)]
#[command(about = "Measures active coding time per git repository and logs it into each commit")]
struct Args {
    /// Directory whose immediate subdirectories are scanned for git repositories.
    basedir: PathBuf,
    /// Maximum gap in seconds between two activity events that still count as
    /// the same working session.
    #[arg(long, default_value_t = DEFAULT_HEARTBEAT_SECONDS)]
    heartbeat: u64,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console")]
    log_console: bool,
    #[arg(long = "log-filter")]
    log: Option<LevelFilter>,
}

pub async fn run_cli() -> Result<()> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // A missing or malformed argument prints usage and exits cleanly.
            e.print()?;
            return Ok(());
        }
    };

    if !args.basedir.is_dir() {
        eprintln!("{} is not a directory\n", args.basedir.display());
        Args::command().print_help()?;
        return Ok(());
    }

    let app_dir = create_application_default_path()?;
    enable_logging(MONITOR_PREFIX, &app_dir, args.log, args.log_console)?;

    start_monitor(args.basedir, args.heartbeat as f64).await
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Args;

    #[test]
    fn heartbeat_defaults_to_five_minutes() {
        let args = Args::parse_from(["worktally", "/some/dir"]);
        assert_eq!(args.heartbeat, 300);
        assert_eq!(args.basedir, std::path::PathBuf::from("/some/dir"));
    }

    #[test]
    fn heartbeat_can_be_overridden() {
        let args = Args::parse_from(["worktally", "/some/dir", "--heartbeat", "600"]);
        assert_eq!(args.heartbeat, 600);
    }

    #[test]
    fn missing_basedir_is_a_parse_error() {
        assert!(Args::try_parse_from(["worktally"]).is_err());
    }
}

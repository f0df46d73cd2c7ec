//! Passive work-time meter for git repositories. Watches a base directory of
//! working trees, coalesces filesystem activity into sessions under a
//! heartbeat policy, and amends each freshly authored commit with a work log
//! entry recording the active time since the previous one.
//!

pub mod cli;
pub mod git;
pub mod monitor;
pub mod utils;
pub mod watch;

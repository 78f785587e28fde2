//! Command-line interface for ghtally
//!
//! Two commands are provided:
//!
//! - **update**: collect the statistics of an account, rewrite the SVG templates and print a
//!   summary. This is the command a scheduled job runs.
//! - **init**: write a default configuration file.
//!
//! `update` loads the configuration, builds the HTTP transport and retrying gateway, and hands
//! them to a [`crate::stats::Collector`] along with the per-identity cache store. The resulting
//! totals feed both report sinks. Nothing is written to the templates if collection fails.
//!
//! All output goes through the [`Host`] trait so the commands can run against in-memory
//! buffers in tests.

mod common;
mod config;
mod host;
mod init;
mod progress_reporter;
mod run;
mod update;

#[cfg(debug_assertions)]
pub use config::Config;

pub use host::Host;
pub use init::{InitArgs, init_config};
pub use progress_reporter::ProgressReporter;
pub use run::run;
pub use update::{UpdateArgs, update};

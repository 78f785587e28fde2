//! Pieces shared by the commands.

use crate::Result;
use clap::ValueEnum;
use core::time::Duration;
use directories::BaseDirs;
use ohno::IntoAppError;
use std::io::IsTerminal;
use std::path::PathBuf;

/// When to emit ANSI colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Emit colors even when redirected
    Always,

    /// Plain text only
    Never,

    /// Emit colors only when writing to a terminal
    Auto,
}

impl ColorMode {
    /// Resolve the mode against a stream, `Auto` meaning "if it is a terminal".
    pub fn resolve(self, stream: &impl IsTerminal) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => stream.is_terminal(),
        }
    }
}

/// Verbosity of the diagnostic log written to stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Silent
    None,

    /// Fatal failures only
    Error,

    /// Also retries and skipped repositories
    Warn,

    /// Also which repositories are recomputed
    Info,

    /// Also cache hits and file operations
    Debug,

    /// Everything, including each request
    Trace,
}

/// Initialize the logger for `log_level`. `RUST_LOG` takes precedence when set.
pub fn init_logging(log_level: LogLevel) {
    let level = match log_level {
        LogLevel::None => return,
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    // A second initialization in the same process (tests) is harmless
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
        .try_init();
}

/// How long the progress bar waits before showing itself.
///
/// With logging enabled the bar would interleave with log lines, so it stays hidden.
pub const fn progress_delay(log_level: LogLevel) -> Duration {
    if matches!(log_level, LogLevel::None) {
        Duration::from_millis(300)
    } else {
        Duration::from_hours(365 * 24)
    }
}

/// The platform cache directory for ghtally.
pub fn default_cache_dir() -> Result<PathBuf> {
    Ok(BaseDirs::new()
        .into_app_err("could not determine cache directory")?
        .cache_dir()
        .join("ghtally"))
}

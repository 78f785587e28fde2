use super::common::{ColorMode, LogLevel, default_cache_dir, init_logging, progress_delay};
use super::config::Config;
use super::{Host, ProgressReporter};
use crate::Result;
use crate::reports::{RenderFields, generate_console, svg};
use crate::stats::{CacheStore, Collector, Gateway, HttpTransport, Progress};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{Local, Utc};
use clap::Parser;
use ohno::IntoAppError;
use std::io::{Write, stderr, stdout};
use std::time::Instant;
use url::Url;

const LOG_TARGET: &str = "    update";

#[derive(Parser, Debug)]
pub struct UpdateArgs {
    /// GitHub login whose statistics are collected
    #[arg(long, value_name = "LOGIN", env = "USER_NAME")]
    pub login: String,

    /// GitHub personal access token
    #[arg(long, value_name = "TOKEN", env = "ACCESS_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Path to configuration file (default is `ghtally.toml`)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Directory where per-account caches are kept
    #[arg(long, value_name = "PATH")]
    pub cache_dir: Option<Utf8PathBuf>,

    /// GraphQL endpoint, overriding the configuration
    #[arg(long, value_name = "URL")]
    pub api_url: Option<Url>,

    /// SVG template to rewrite; may be repeated (default comes from the configuration)
    #[arg(long, value_name = "PATH")]
    pub template: Vec<Utf8PathBuf>,

    /// Ignore cached aggregates and walk every history again
    #[arg(long)]
    pub force_refresh: bool,

    /// Control when to use colored output
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorMode,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none")]
    pub log_level: LogLevel,
}

/// Collect the statistics of the account, rewrite the templates and print a summary.
///
/// Templates are only touched once collection has fully succeeded.
pub async fn update<H: Host>(host: &mut H, args: &UpdateArgs) -> Result<()> {
    init_logging(args.log_level);
    let start = Instant::now();

    let config = Config::load(Utf8Path::new("."), args.config.as_ref())?;

    let api_url = match &args.api_url {
        Some(url) => url.clone(),
        None => config.api_url()?,
    };

    let cache_dir = match args.cache_dir.as_ref().or(config.cache_dir.as_ref()) {
        Some(dir) => dir.as_std_path().to_path_buf(),
        None => default_cache_dir()?,
    };

    let templates = if args.template.is_empty() { &config.templates } else { &args.template };

    let transport = HttpTransport::new(&args.token, api_url, config.request_timeout())?;
    let progress = ProgressReporter::new(progress_delay(args.log_level), args.color.resolve(&stderr()));
    let collector = Collector::new(
        Gateway::new(transport, config.retry_policy()),
        CacheStore::new(cache_dir),
        config.collector_options(),
        progress.clone(),
        Utc::now(),
    );

    let result = collector
        .collect(&args.login, args.force_refresh, config.birthday, Local::now().date_naive())
        .await;
    progress.done();

    let totals = match result {
        Ok(totals) => totals,
        Err(e) => {
            log::error!(target: LOG_TARGET, "Collecting statistics for '{}' failed: {e:#}", args.login);
            return Err(e);
        }
    };

    let fields = RenderFields::from(&totals);
    let mut written = 0;
    for template in templates {
        if svg::overwrite(template.as_std_path(), &fields)? {
            written += 1;
        }
    }

    log::info!(target: LOG_TARGET, "Rewrote {written} template(s), total runtime {:.3}s", start.elapsed().as_secs_f64());

    if written == 0 && !templates.is_empty() {
        let _ = writeln!(host.error(), "No template was found, nothing was rewritten");
    }

    let mut summary = String::new();
    generate_console(&totals, args.color.resolve(&stdout()), &mut summary)?;
    write!(host.output(), "{summary}").into_app_err("writing the summary")?;

    Ok(())
}

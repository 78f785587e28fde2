use crate::Result;
use crate::stats::{CollectorOptions, RetryPolicy};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDate;
use core::time::Duration;
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use url::Url;

/// The default configuration TOML content, embedded from `default_config.toml`
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../default_config.toml");

/// Name of the configuration file looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "ghtally.toml";

const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// GraphQL endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Directory holding the per-account caches
    #[serde(default)]
    pub cache_dir: Option<Utf8PathBuf>,

    /// SVG templates to rewrite
    #[serde(default = "default_templates")]
    pub templates: Vec<Utf8PathBuf>,

    /// Date the account age is measured from, instead of the account creation date
    #[serde(default)]
    pub birthday: Option<NaiveDate>,

    #[serde(default = "default_max_concurrent_repos")]
    pub max_concurrent_repos: usize,

    /// Commits per history page (1..=100)
    #[serde(default = "default_commit_page_size")]
    pub commit_page_size: u32,

    /// Repositories per listing page (1..=100)
    #[serde(default = "default_repo_page_size")]
    pub repo_page_size: u32,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_transport_backoff_secs")]
    pub transport_backoff_secs: u64,

    #[serde(default = "default_server_backoff_secs")]
    pub server_backoff_secs: u64,

    #[serde(default = "default_throttle_backoff_secs")]
    pub throttle_backoff_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Skip repositories answering a plain HTTP 403 instead of failing the run
    #[serde(default)]
    pub skip_forbidden_repos: bool,
}

fn default_api_url() -> String {
    "https://api.github.com/graphql".to_string()
}

fn default_templates() -> Vec<Utf8PathBuf> {
    vec![Utf8PathBuf::from("dark_mode.svg"), Utf8PathBuf::from("light_mode.svg")]
}

const fn default_max_concurrent_repos() -> usize {
    8
}

const fn default_commit_page_size() -> u32 {
    100
}

const fn default_repo_page_size() -> u32 {
    60
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_transport_backoff_secs() -> u64 {
    2
}

const fn default_server_backoff_secs() -> u64 {
    5
}

const fn default_throttle_backoff_secs() -> u64 {
    10
}

const fn default_request_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Load configuration from a file or use defaults
    ///
    /// Without an explicit path, `ghtally.toml` in `base_dir` is used when it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated
    pub fn load(base_dir: &Utf8Path, config_path: Option<&Utf8PathBuf>) -> Result<Self> {
        let (final_path, text) = if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading configuration file '{path}'"))?;
            (path.clone(), text)
        } else {
            let path = base_dir.join(CONFIG_FILE_NAME);
            match fs::read_to_string(&path) {
                Ok(text) => (path, text),
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
                Err(e) => return Err(e).into_app_err_with(|| format!("reading configuration file '{path}'")),
            }
        };

        let config: Self = toml::from_str(&text).into_app_err_with(|| format!("parsing configuration file '{final_path}'"))?;
        config.validate()?;

        Ok(config)
    }

    /// Save the default configuration to a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file already exists or cannot be written
    pub fn save_default(output_path: &Utf8Path) -> Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(output_path)
            .into_app_err_with(|| format!("creating configuration file '{output_path}'"))?;

        file.write_all(DEFAULT_CONFIG_TOML.as_bytes())
            .into_app_err_with(|| format!("writing default configuration to '{output_path}'"))?;
        Ok(())
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error if a value is out of range or the endpoint is not a URL
    fn validate(&self) -> Result<()> {
        let _ = self.api_url()?;

        for (name, value) in [("commit_page_size", self.commit_page_size), ("repo_page_size", self.repo_page_size)] {
            if !(1..=MAX_PAGE_SIZE).contains(&value) {
                return Err(app_err!("{name} must be between 1 and {MAX_PAGE_SIZE}, got {value}"));
            }
        }

        if self.max_concurrent_repos == 0 {
            return Err(app_err!("max_concurrent_repos must be at least 1"));
        }

        if self.max_attempts == 0 {
            return Err(app_err!("max_attempts must be at least 1"));
        }

        if self.request_timeout_secs == 0 {
            return Err(app_err!("request_timeout_secs must be at least 1"));
        }

        Ok(())
    }

    /// The parsed GraphQL endpoint
    ///
    /// # Errors
    ///
    /// Returns an error if `api_url` is not a valid URL
    pub fn api_url(&self) -> Result<Url> {
        Url::parse(&self.api_url).into_app_err_with(|| format!("invalid api_url '{}'", self.api_url))
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            transport_backoff: Duration::from_secs(self.transport_backoff_secs),
            server_backoff: Duration::from_secs(self.server_backoff_secs),
            throttle_backoff: Duration::from_secs(self.throttle_backoff_secs),
            skip_forbidden: self.skip_forbidden_repos,
        }
    }

    #[must_use]
    pub const fn collector_options(&self) -> CollectorOptions {
        CollectorOptions {
            max_concurrent_repos: self.max_concurrent_repos,
            commit_page_size: self.commit_page_size,
            repo_page_size: self.repo_page_size,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML).expect("default_config.toml should be valid TOML that deserializes to Config")
    }
}

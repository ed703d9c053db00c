//! Service configuration, read once from the environment at startup.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::db::default_database_path;
use crate::error::ConfigError;
use crate::secrets::{expand_home, resolve_secret_optional};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_RECENCY_WINDOW: &str = "newer_than:2d";
pub const DEFAULT_MAX_RESULTS: u32 = 20;
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_ACCOUNT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_DEADLINE_SECS: u64 = 540;

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(format!("expected 'json' or 'pretty', got '{}'", other)),
        }
    }
}

/// Tuning of one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    /// Appended to every filter query.
    pub recency_window: String,
    /// Result cap per search.
    pub max_results: u32,
    /// Accounts processed at the same time.
    pub concurrency: usize,
    pub account_timeout: Duration,
    /// Budget for the whole cycle.
    pub deadline: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            recency_window: DEFAULT_RECENCY_WINDOW.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
            concurrency: DEFAULT_CONCURRENCY,
            account_timeout: Duration::from_secs(DEFAULT_ACCOUNT_TIMEOUT_SECS),
            deadline: Duration::from_secs(DEFAULT_DEADLINE_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: PathBuf,
    pub token_encryption_key: Option<SecretString>,
    pub line_channel_access_token: Option<SecretString>,
    pub scheduler_secret: Option<SecretString>,
    pub google_client_id: Option<SecretString>,
    pub google_client_secret: Option<SecretString>,
    pub log_format: LogFormat,
    pub poll: PollSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let secret = |name: &'static str| -> Result<Option<SecretString>, ConfigError> {
            let file_var = format!("{}_FILE", name);
            resolve_secret_optional(get(name).as_deref(), get(&file_var).as_deref())
                .map_err(|source| ConfigError::Secret { var: name, source })
        };

        let database_path = match get("DATABASE_PATH") {
            Some(path) => PathBuf::from(expand_home(&path)),
            None => default_database_path().ok_or_else(|| ConfigError::Invalid {
                var: "DATABASE_PATH",
                reason: "not set and no home directory to default to".to_string(),
            })?,
        };

        let poll = PollSettings {
            recency_window: get("POLL_RECENCY_WINDOW")
                .unwrap_or_else(|| DEFAULT_RECENCY_WINDOW.to_string()),
            max_results: parse_var(&get, "POLL_MAX_RESULTS", DEFAULT_MAX_RESULTS)?,
            concurrency: positive(
                "POLL_CONCURRENCY",
                parse_var(&get, "POLL_CONCURRENCY", DEFAULT_CONCURRENCY)?,
            )?,
            account_timeout: Duration::from_secs(positive(
                "POLL_ACCOUNT_TIMEOUT_SECS",
                parse_var(&get, "POLL_ACCOUNT_TIMEOUT_SECS", DEFAULT_ACCOUNT_TIMEOUT_SECS)?,
            )?),
            deadline: Duration::from_secs(positive(
                "POLL_DEADLINE_SECS",
                parse_var(&get, "POLL_DEADLINE_SECS", DEFAULT_DEADLINE_SECS)?,
            )?),
        };

        Ok(Self {
            port: parse_var(&get, "PORT", DEFAULT_PORT)?,
            database_path,
            token_encryption_key: secret("TOKEN_ENCRYPTION_KEY")?,
            line_channel_access_token: secret("LINE_CHANNEL_ACCESS_TOKEN")?,
            scheduler_secret: secret("SCHEDULER_SECRET")?,
            google_client_id: secret("GOOGLE_CLIENT_ID")?,
            google_client_secret: secret("GOOGLE_CLIENT_SECRET")?,
            log_format: parse_var(&get, "LOG_FORMAT", LogFormat::default())?,
            poll,
        })
    }
}

fn parse_var<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var: name,
            reason: format!("'{}': {}", raw, e),
        }),
        None => Ok(default),
    }
}

fn positive<T: PartialEq + Default>(name: &'static str, value: T) -> Result<T, ConfigError> {
    if value == T::default() {
        return Err(ConfigError::Invalid {
            var: name,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

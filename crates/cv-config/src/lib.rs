//! # cv-config
//!
//! Layered settings for the campvoice client, lowest priority first:
//!
//! 1. built-in defaults
//! 2. an optional `campvoice.{toml,yaml,json}` file
//! 3. `.env` (loaded into the process environment)
//! 4. `CAMPVOICE_*` environment variables, `__` separating sections
//!    (e.g. `CAMPVOICE_API__BASE_URL`, `CAMPVOICE_CACHE__BACKEND=fs`)

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const ENV_PREFIX: &str = "CAMPVOICE";
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api/";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    pub base_url: String,
    /// No timeout when unset.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl ApiSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Sqlite,
    Fs,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub backend: CacheBackend,
    /// Database file for `sqlite`, root directory for `fs`.
    pub path: PathBuf,
}

impl CacheSettings {
    /// sqlx connection URL for the sqlite backend.
    pub fn sqlite_url(&self) -> String {
        format!("sqlite://{}", self.path.display())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins when set.
    pub filter: String,
    pub json: bool,
}

/// Optional non-interactive login, e.g. for scripted use.
#[derive(Debug, Default, Deserialize)]
pub struct Credentials {
    pub identifier: Option<String>,
    pub password: Option<SecretString>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub api: ApiSettings,
    pub cache: CacheSettings,
    pub log: LogSettings,
    #[serde(default)]
    pub credentials: Credentials,
}

impl Settings {
    /// Loads `.env`, then `campvoice.*` from the working directory (or
    /// `file` when given), then the environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => debug!(error = %e, "ignoring unreadable .env"),
        }
        let env = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true);
        Self::from_sources(file, env)
    }

    fn from_sources(file: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let file = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name("campvoice").required(false),
        };
        let settings: Settings = Config::builder()
            .set_default("api.base_url", DEFAULT_BASE_URL)?
            .set_default("cache.backend", "sqlite")?
            .set_default("cache.path", "campvoice-cache.db")?
            .set_default("log.filter", "info")?
            .set_default("log.json", false)?
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let url = self.api.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                key: "api.base_url",
                reason: format!("expected an http(s) URL, got `{url}`"),
            });
        }
        if self.api.request_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid {
                key: "api.request_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.cache.backend != CacheBackend::Memory && self.cache.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                key: "cache.path",
                reason: "required for persistent cache backends".to_string(),
            });
        }
        Ok(())
    }
}

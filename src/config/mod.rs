//! Configuration management for `issue_tracker`.
//!
//! Configuration is layered, later layers winning:
//! - Built-in defaults
//! - YAML file (`--config PATH`, else `./issue-tracker.yaml` when present)
//! - Environment variable overrides (`ISSUE_TRACKER_*`, `PORT`)
//! - Command-line flags

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "issue-tracker.yaml";

pub const ENV_BIND: &str = "ISSUE_TRACKER_BIND";
pub const ENV_STORE: &str = "ISSUE_TRACKER_STORE";
pub const ENV_DATABASE: &str = "ISSUE_TRACKER_DATABASE";
pub const ENV_ID_PREFIX: &str = "ISSUE_TRACKER_ID_PREFIX";
pub const ENV_PORT: &str = "PORT";

/// Which persistence backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local store; contents are lost on exit.
    #[default]
    Memory,
    /// Single-file `SQLite` database.
    Sqlite,
}

impl StoreBackend {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StoreBackend {
    type Err = TrackerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(TrackerError::config(format!("unknown store backend '{other}'"))),
        }
    }
}

/// Resolved service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Listen address.
    pub bind: SocketAddr,
    pub store: StoreBackend,
    /// Database file, used when `store` is `sqlite`.
    pub database: PathBuf,
    /// Prefix for generated issue ids.
    pub id_prefix: String,
    /// Emit logs as JSON lines.
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
            store: StoreBackend::Memory,
            database: PathBuf::from("issues.db"),
            id_prefix: issues_lib::util::DEFAULT_ID_PREFIX.to_string(),
            log_json: false,
        }
    }
}

/// Values supplied on the command line; `None` leaves the lower layer alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bind: Option<SocketAddr>,
    pub store: Option<StoreBackend>,
    pub database: Option<PathBuf>,
    pub log_json: bool,
}

impl Config {
    /// Load configuration from all layers.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit config file is missing, the file or an
    /// environment value is malformed, or the result fails validation.
    pub fn load(explicit: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        Self::load_with_env(explicit, overrides, |key| std::env::var(key).ok())
    }

    /// Like [`Config::load`], reading the environment through `env`.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn load_with_env<F>(explicit: Option<&Path>, overrides: &Overrides, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match explicit {
            Some(path) if !path.exists() => {
                return Err(TrackerError::ConfigNotFound(path.to_path_buf()));
            }
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(env)?;
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML config file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, or `Yaml` if it does not parse.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&text).map_err(|source| TrackerError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_env<F>(&mut self, env: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = env(ENV_PORT) {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|_| TrackerError::config(format!("{ENV_PORT}: invalid port '{port}'")))?;
            self.bind.set_port(port);
        }
        if let Some(bind) = env(ENV_BIND) {
            self.bind = bind
                .trim()
                .parse()
                .map_err(|_| {
                    TrackerError::config(format!("{ENV_BIND}: invalid address '{bind}'"))
                })?;
        }
        if let Some(store) = env(ENV_STORE) {
            self.store = store.parse()?;
        }
        if let Some(database) = env(ENV_DATABASE) {
            self.database = PathBuf::from(database);
        }
        if let Some(prefix) = env(ENV_ID_PREFIX) {
            self.id_prefix = prefix.trim().to_string();
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(bind) = overrides.bind {
            self.bind = bind;
        }
        if let Some(store) = overrides.store {
            self.store = store;
        }
        if let Some(ref database) = overrides.database {
            self.database.clone_from(database);
        }
        if overrides.log_json {
            self.log_json = true;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.id_prefix.is_empty() || self.id_prefix.len() > 16 {
            return Err(TrackerError::config("id_prefix must be 1-16 characters"));
        }
        if !self
            .id_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(TrackerError::config(
                "id_prefix may only contain letters, digits and underscores",
            ));
        }
        if self.store == StoreBackend::Sqlite && self.database.as_os_str().is_empty() {
            return Err(TrackerError::config("database path is required for the sqlite store"));
        }
        Ok(())
    }
}

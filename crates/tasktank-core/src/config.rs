//! Store configuration.
//!
//! Read from a TOML file, then overridden by environment variables:
//!
//! ```toml
//! tasks_path = "/var/lib/tasktank/tasks.jsonl"
//! save_throttle_ms = 500
//! event_capacity = 128
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Overrides `tasks_path`.
pub const ENV_TASKS_PATH: &str = "TASKTANK_TASKS_PATH";
/// Overrides `save_throttle_ms`.
pub const ENV_SAVE_THROTTLE_MS: &str = "TASKTANK_SAVE_THROTTLE_MS";

const DEFAULT_DIR: &str = ".tasktank";
const DEFAULT_FILE: &str = "tasks.jsonl";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot determine home directory; set tasks_path or {ENV_TASKS_PATH}")]
    NoHomeDir,

    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSONL mirror location. `None` means `~/.tasktank/tasks.jsonl`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks_path: Option<PathBuf>,

    /// Longest time an unsaved change waits for its throttled write.
    pub save_throttle_ms: u64,

    /// Per-subscriber event buffer.
    pub event_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            tasks_path: None,
            save_throttle_ms: 1000,
            event_capacity: 64,
        }
    }
}

/// `~/.tasktank/tasks.jsonl`
pub fn default_tasks_path() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_DIR).join(DEFAULT_FILE))
        .ok_or(ConfigError::NoHomeDir)
}

impl StoreConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `TASKTANK_*` overrides from the process environment.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from `lookup` (the environment, or a map in tests).
    pub fn apply_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = lookup(ENV_TASKS_PATH).filter(|v| !v.trim().is_empty()) {
            self.tasks_path = Some(PathBuf::from(path.trim()));
        }
        if let Some(raw) = lookup(ENV_SAVE_THROTTLE_MS) {
            self.save_throttle_ms =
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidEnv {
                        var: ENV_SAVE_THROTTLE_MS,
                        value: raw.clone(),
                    })?;
        }
        Ok(self)
    }

    /// Configured path, or the home-directory default.
    pub fn resolved_tasks_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.tasks_path {
            Some(path) => Ok(path.clone()),
            None => default_tasks_path(),
        }
    }

    pub fn save_throttle(&self) -> Duration {
        Duration::from_millis(self.save_throttle_ms)
    }
}

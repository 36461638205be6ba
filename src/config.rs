//! User configuration.
//!
//! Loaded once at startup from a YAML file, then overridden by environment
//! variables. The resulting [`Config`] value is passed to whatever needs it;
//! nothing reads configuration from global state.

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::gateway::Backend;
use crate::gateway::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Default timeout for a single backend call (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

pub const API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";
pub const BACKEND_ENV_VAR: &str = "COMMITTER_BACKEND";
pub const MODEL_ENV_VAR: &str = "COMMITTER_MODEL";
pub const TIMEOUT_ENV_VAR: &str = "COMMITTER_TIMEOUT";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub backend: Backend,
    pub gemini_api_key: Option<String>,
    /// Gemini model name.
    pub model: String,
    pub gemini_base_url: String,
    pub timeout_secs: u64,
    /// Remotes to push to. Empty means every configured remote.
    pub remotes: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            gemini_api_key: None,
            model: DEFAULT_MODEL.to_string(),
            gemini_base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            remotes: Vec::new(),
        }
    }
}

// Hand-written so the API key never ends up in logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("backend", &self.backend)
            .field(
                "gemini_api_key",
                &self.gemini_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("model", &self.model)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("remotes", &self.remotes)
            .finish()
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the default location is used
    /// if present and defaults otherwise. Environment overrides apply last.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = default_config_path();
                if path.is_file() {
                    Self::from_file(&path)?
                } else {
                    debug!("no config file at {}, using defaults", path.display());
                    Self::default()
                }
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse a YAML config file. An empty file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let mut config: Self =
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if config.timeout_secs == 0 {
            warn!(
                "Invalid timeoutSecs 0 in {}, using default {}s",
                path.display(),
                DEFAULT_TIMEOUT_SECS
            );
            config.timeout_secs = DEFAULT_TIMEOUT_SECS;
        }

        Ok(config)
    }

    /// Apply `GEMINI_API_KEY`, `COMMITTER_BACKEND`, `COMMITTER_MODEL` and
    /// `COMMITTER_TIMEOUT`. Invalid values, including a zero timeout, are
    /// logged and ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Some(key) = non_empty_var(API_KEY_ENV_VAR) {
            self.gemini_api_key = Some(key);
        }

        if let Some(value) = non_empty_var(BACKEND_ENV_VAR) {
            match value.parse::<Backend>() {
                Ok(backend) => self.backend = backend,
                Err(e) => warn!("Invalid {} value '{}': {}", BACKEND_ENV_VAR, value, e),
            }
        }

        if let Some(model) = non_empty_var(MODEL_ENV_VAR) {
            self.model = model;
        }

        if let Some(value) = non_empty_var(TIMEOUT_ENV_VAR) {
            match value.parse::<u64>() {
                Ok(secs) if secs > 0 => self.timeout_secs = secs,
                _ => warn!(
                    "Invalid {} value '{}', keeping {}s",
                    TIMEOUT_ENV_VAR, value, self.timeout_secs
                ),
            }
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// `$XDG_CONFIG_HOME/committer/config.yaml`, falling back to
/// `~/.config/committer/config.yaml`.
pub fn default_config_path() -> PathBuf {
    env::var("XDG_CONFIG_HOME")
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config")
        })
        .join("committer")
        .join("config.yaml")
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

//! Daemon configuration loaded from YAML.
//!
//! Every field is optional; a missing file yields the defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use nmprio::{BackoffPolicy, EngineConfig, ScanTrigger};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/nmprio/daemon.yml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackoffConfig {
    pub initial_ms: u64,
    pub factor: f64,
    pub max_secs: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        let policy = BackoffPolicy::default();
        Self {
            initial_ms: policy.initial.as_millis() as u64,
            factor: policy.factor,
            max_secs: policy.max.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    pub poll_interval_secs: u64,
    pub backoff: BackoffConfig,
    pub priority_offset: i32,
    /// `None` keeps the built-in rescan command, an empty list selects D-Bus.
    pub scan_command: Option<Vec<String>>,
    pub lock_file: Option<PathBuf>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            poll_interval_secs: engine.poll_interval.as_secs(),
            backoff: BackoffConfig::default(),
            priority_offset: engine.priority_offset,
            scan_command: None,
            lock_file: None,
        }
    }
}

impl DaemonConfig {
    /// Loads and validates `path`. A missing file is not an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config = Self::parse(&text).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to a mapping.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid("poll_interval_secs must be > 0".into()));
        }
        if self.backoff.initial_ms == 0 {
            return Err(ConfigError::Invalid("backoff.initial_ms must be > 0".into()));
        }
        if !self.backoff.factor.is_finite() || self.backoff.factor < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "backoff.factor must be a finite number >= 1, got {}",
                self.backoff.factor
            )));
        }
        let max = Duration::from_secs(self.backoff.max_secs);
        if max < Duration::from_millis(self.backoff.initial_ms) {
            return Err(ConfigError::Invalid(
                "backoff.max_secs must not be below backoff.initial_ms".into(),
            ));
        }
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            backoff: BackoffPolicy {
                initial: Duration::from_millis(self.backoff.initial_ms),
                factor: self.backoff.factor,
                max: Duration::from_secs(self.backoff.max_secs),
            },
            priority_offset: self.priority_offset,
        }
    }

    pub fn scan_trigger(&self) -> ScanTrigger {
        match &self.scan_command {
            None => ScanTrigger::default(),
            Some(argv) => ScanTrigger::from_command(argv.clone()),
        }
    }
}

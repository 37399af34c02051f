//! Provider configuration: AWS connection, operation timeouts and tag policy.
//!
//! Loaded from JSON. Durations are humantime strings such as `"10m"`,
//! `"30s"` or `"1h 30m"`.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::client::AwsConfig;
use crate::tags::{DefaultTagsConfig, IgnoreTagsConfig};

/// Default deadline for create, update and delete waits.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("parsing config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Per-operation deadlines and polling cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    #[serde(default = "default_operation_timeout", with = "humantime_serde")]
    pub create: Duration,
    #[serde(default = "default_operation_timeout", with = "humantime_serde")]
    pub update: Duration,
    #[serde(default = "default_operation_timeout", with = "humantime_serde")]
    pub delete: Duration,
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Wait before the first status probe after a mutating call.
    #[serde(default, with = "humantime_serde")]
    pub delay: Duration,
}

fn default_operation_timeout() -> Duration {
    DEFAULT_OPERATION_TIMEOUT
}

fn default_poll_interval() -> Duration {
    crate::wait::DEFAULT_POLL_INTERVAL
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: DEFAULT_OPERATION_TIMEOUT,
            update: DEFAULT_OPERATION_TIMEOUT,
            delete: DEFAULT_OPERATION_TIMEOUT,
            poll_interval: default_poll_interval(),
            delay: Duration::ZERO,
        }
    }
}

/// Everything the reconciler needs besides the per-table declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub default_tags: DefaultTagsConfig,
    #[serde(default)]
    pub ignore_tags: IgnoreTagsConfig,
}

impl ProviderConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeouts.poll_interval < crate::wait::MIN_POLL_INTERVAL {
            return Err(ConfigError::Invalid {
                field: "timeouts.poll_interval",
                reason: format!(
                    "{:?} is shorter than the minimum of {:?}",
                    self.timeouts.poll_interval,
                    crate::wait::MIN_POLL_INTERVAL
                ),
            });
        }
        self.aws.connect_timeout()?;
        self.aws.read_timeout()?;
        Ok(())
    }
}

//! Configuration types for board-attachments

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for [`crate::AttachmentDownloader`]
///
/// Every field has a default, so an empty JSON object `{}` is a valid config file.
/// The defaults reproduce a plain sequential, fail-fast, overwrite-everything run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Root directory that receives one sub-directory per card (default: "./attachments")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Maximum concurrent retrievals (default: 1, strictly sequential)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// What a failed job does to the rest of the run
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// What to do when a destination file already exists
    #[serde(default)]
    pub existing_files: ExistingFileAction,

    /// How a URL becomes a file name (default: the literal last URL segment)
    #[serde(default)]
    pub file_naming: FileNaming,

    /// Timeout for a whole retrieval, body included (default: 300 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Timeout for establishing the connection (default: 30 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// User-Agent header sent with every retrieval
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Retry behavior for transient retrieval failures
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            max_concurrent_downloads: default_max_concurrent(),
            failure_policy: FailurePolicy::default(),
            existing_files: ExistingFileAction::default(),
            file_naming: FileNaming::default(),
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Load a configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read(path)?;
        let config: Config = serde_json::from_slice(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file, using `output_dir` when the file does not set one
    ///
    /// Lets a caller keep its own default output root (for the CLI, the directory
    /// next to the export) while the file tunes other settings.
    pub fn from_file_with_output_dir(path: &Path, output_dir: &Path) -> Result<Self> {
        let content = std::fs::read(path)?;
        let mut value: serde_json::Value = serde_json::from_slice(&content)?;
        if let Some(fields) = value.as_object_mut() {
            fields
                .entry("output_dir")
                .or_insert_with(|| serde_json::Value::from(output_dir.to_string_lossy()));
        }
        let config: Config = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that serde cannot reject on its own
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_downloads == 0 {
            return Err(Error::Config {
                message: "max_concurrent_downloads must be at least 1".to_string(),
                key: Some("max_concurrent_downloads".to_string()),
            });
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(Error::Config {
                message: format!(
                    "backoff_multiplier must be >= 1.0, got {}",
                    self.retry.backoff_multiplier
                ),
                key: Some("retry.backoff_multiplier".to_string()),
            });
        }
        Ok(())
    }
}

/// What a failed job does to the rest of the run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop scheduling new jobs after the first failure and report it (default)
    #[default]
    FailFast,
    /// Attempt every job, then report how many failed
    ContinueOnError,
}

/// Handling of destination files left by an earlier run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExistingFileAction {
    /// Download again and replace the file (default)
    #[default]
    Overwrite,
    /// Leave the file alone and report the job as skipped
    Skip,
}

/// How the file name part of a destination is derived from the source URL
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileNaming {
    /// Text after the last `/`, escapes and query string included (default)
    #[default]
    Raw,
    /// Last path segment, percent-decoded, query string and fragment dropped
    Decoded,
}

/// Retry configuration for transient retrieval failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try (default: 0, no retry)
    #[serde(default)]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("attachments")
}

fn default_max_concurrent() -> usize {
    1
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("board-attachments/{}", env!("CARGO_PKG_VERSION"))
}

fn default_true() -> bool {
    true
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

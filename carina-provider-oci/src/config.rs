//! Provider configuration
//!
//! Configuration is read from a TOML file and can be overridden from the
//! environment:
//!
//! ```toml
//! region = "us-ashburn-1"
//! auth_token = "..."
//!
//! [retry]
//! max_attempts = 8
//! initial_backoff_ms = 1000
//!
//! [work_requests]
//! poll_interval_ms = 10000
//! ```

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retry::{RetryPolicy, RetryWindows};

pub const ENV_REGION: &str = "OCI_REGION";
pub const ENV_ENDPOINT: &str = "OCI_GOLDEN_GATE_ENDPOINT";
pub const ENV_AUTH_TOKEN: &str = "OCI_AUTH_TOKEN";

/// GoldenGate API version the client speaks
pub const API_VERSION: &str = "20200407";

static REGION_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-z]+(-[a-z]+)+-\d+$").ok());

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OciConfig {
    /// Region identifier, e.g. "us-ashburn-1"
    #[serde(default)]
    pub region: Option<String>,

    /// Full base URL of the GoldenGate API, replacing the regional endpoint
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Bearer token sent with every request
    #[serde(default)]
    pub auth_token: Option<String>,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub work_requests: WorkRequestConfig,
}

impl Default for OciConfig {
    fn default() -> Self {
        Self {
            region: None,
            endpoint: None,
            auth_token: None,
            user_agent: default_user_agent(),
            retry: RetryConfig::default(),
            work_requests: WorkRequestConfig::default(),
        }
    }
}

impl OciConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `OCI_REGION`, `OCI_GOLDEN_GATE_ENDPOINT` and `OCI_AUTH_TOKEN`
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(region) = non_empty(ENV_REGION) {
            self.region = Some(region);
        }
        if let Some(endpoint) = non_empty(ENV_ENDPOINT) {
            self.endpoint = Some(endpoint);
        }
        if let Some(token) = non_empty(ENV_AUTH_TOKEN) {
            self.auth_token = Some(token);
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match (&self.region, &self.endpoint) {
            (None, None) => {
                return Err(ConfigError::Invalid(format!(
                    "either region or endpoint must be set (or {} / {})",
                    ENV_REGION, ENV_ENDPOINT
                )));
            }
            (_, Some(endpoint)) => {
                if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
                    return Err(ConfigError::Invalid(format!(
                        "endpoint must be an http(s) URL, got '{}'",
                        endpoint
                    )));
                }
            }
            (Some(region), None) => {
                if !REGION_PATTERN.as_ref().is_some_and(|re| re.is_match(region)) {
                    return Err(ConfigError::Invalid(format!(
                        "'{}' is not a valid region identifier",
                        region
                    )));
                }
            }
        }

        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(ConfigError::Invalid(
                "retry.initial_backoff_ms must not exceed retry.max_backoff_ms".to_string(),
            ));
        }
        if self.retry.max_attempts == Some(0) {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL of the GoldenGate API, without trailing slash
    pub fn endpoint_url(&self) -> Result<String, ConfigError> {
        self.validate()?;
        if let Some(endpoint) = &self.endpoint {
            return Ok(endpoint.trim_end_matches('/').to_string());
        }
        let region = self.region.as_deref().unwrap_or_default();
        Ok(format!(
            "https://goldengate.{}.oci.oraclecloud.com/{}",
            region, API_VERSION
        ))
    }
}

/// Retry settings applied to every API call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per call; unlimited when unset, in which
    /// case the retry windows bound the retries
    #[serde(default)]
    pub max_attempts: Option<u32>,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    #[serde(default = "default_true")]
    pub jitter: bool,

    /// How long a 404 keeps being retried
    #[serde(default = "default_short_retry_secs")]
    pub short_retry_secs: u64,

    /// How long throttling, conflicts and server errors keep being retried
    #[serde(default = "default_long_retry_secs")]
    pub long_retry_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: None,
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            jitter: true,
            short_retry_secs: default_short_retry_secs(),
            long_retry_secs: default_long_retry_secs(),
        }
    }
}

impl RetryConfig {
    pub fn windows(&self) -> RetryWindows {
        RetryWindows {
            short: Duration::from_secs(self.short_retry_secs),
            long: Duration::from_secs(self.long_retry_secs),
        }
    }

    /// Build the retry policy for one operation
    pub fn policy(&self, disable_not_found_retries: bool) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
            self.jitter,
        )
        .with_default_should_retry(disable_not_found_retries, self.windows())
    }
}

/// Work request polling settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkRequestConfig {
    /// Fixed interval between work request refreshes; grows from 100ms to
    /// 10s when unset
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
}

impl WorkRequestConfig {
    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_ms.map(Duration::from_millis)
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    format!("carina-provider-oci/{}", env!("CARGO_PKG_VERSION"))
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_short_retry_secs() -> u64 {
    120
}

fn default_long_retry_secs() -> u64 {
    600
}

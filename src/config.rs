use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::center::CenterConfig;
use crate::engine::RetryPolicy;

pub const ENV_CONFIG_PATH: &str = "NOTIFY_CONFIG_PATH";
pub const ENV_ENDPOINT: &str = "SAMPLES_ENDPOINT";
pub const ENV_STORE_DIR: &str = "NOTIFY_STORE_DIR";
pub const ENV_POLL_INTERVAL: &str = "NOTIFY_POLL_INTERVAL_SECS";
pub const DEFAULT_CONFIG_PATH: &str = "config/notify.toml";

fn default_endpoint() -> String {
    "http://127.0.0.1:3000/api/muestras".to_string()
}
fn default_poll_interval_secs() -> u64 {
    120
}
fn default_debounce_ms() -> u64 {
    5_000
}
fn default_request_timeout_secs() -> u64 {
    10
}
fn default_max_age_secs() -> u64 {
    24 * 3600
}
fn default_max_attempts() -> u32 {
    3
}
fn default_timeout_retry_ms() -> u64 {
    2_000
}
fn default_network_retry_ms() -> u64 {
    3_000
}
fn default_store_dir() -> String {
    "state".to_string()
}
fn default_store_key() -> String {
    "lab_notifications".to_string()
}

/// Settings for the notification sync engine. Every field has a default,
/// so an empty file (or no file) is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Stored notifications older than this are pruned on load.
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
    /// Attempts per refresh for transient failures, first call included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_timeout_retry_ms")]
    pub timeout_retry_ms: u64,
    #[serde(default = "default_network_retry_ms")]
    pub network_retry_ms: u64,
    #[serde(default = "default_store_dir")]
    pub store_dir: String,
    #[serde(default = "default_store_key")]
    pub store_key: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            poll_interval_secs: default_poll_interval_secs(),
            debounce_ms: default_debounce_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            max_age_secs: default_max_age_secs(),
            max_attempts: default_max_attempts(),
            timeout_retry_ms: default_timeout_retry_ms(),
            network_retry_ms: default_network_retry_ms(),
            store_dir: default_store_dir(),
            store_key: default_store_key(),
        }
    }
}

impl SyncConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: SyncConfig = toml::from_str(s).context("parsing notify config toml")?;
        Ok(cfg.sanitized())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading notify config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $NOTIFY_CONFIG_PATH (must exist when set)
    /// 2) config/notify.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let base = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
            if fallback.exists() {
                Self::load_from(&fallback)?
            } else {
                Self::default()
            }
        };
        Ok(base.with_env_overrides())
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_nonempty(ENV_ENDPOINT) {
            self.endpoint = v;
        }
        if let Some(v) = env_nonempty(ENV_STORE_DIR) {
            self.store_dir = v;
        }
        if let Some(secs) = env_nonempty(ENV_POLL_INTERVAL).and_then(|v| v.parse().ok()) {
            self.poll_interval_secs = secs;
        }
        self.sanitized()
    }

    /// Clamp values that would otherwise busy-loop or never fire.
    fn sanitized(mut self) -> Self {
        self.poll_interval_secs = self.poll_interval_secs.max(1);
        self.request_timeout_secs = self.request_timeout_secs.max(1);
        self.max_attempts = self.max_attempts.max(1);
        if self.store_key.trim().is_empty() {
            self.store_key = default_store_key();
        }
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            timeout_delay: Duration::from_millis(self.timeout_retry_ms),
            network_delay: Duration::from_millis(self.network_retry_ms),
        }
    }

    pub fn center_config(&self) -> CenterConfig {
        CenterConfig {
            poll_interval: self.poll_interval(),
            debounce: self.debounce(),
            retry: self.retry_policy(),
        }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

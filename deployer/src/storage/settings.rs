//! Settings file management

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::logs::LogLevel;

/// Deployer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub json_logs: bool,

    /// Directory holding archives and templates; rendered scripts land here
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// SSH connection settings
    #[serde(default)]
    pub ssh: SshSettings,

    /// Per-step retry policy
    #[serde(default)]
    pub retry: RetrySettings,
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            json_logs: false,
            work_dir: default_work_dir(),
            ssh: SshSettings::default(),
            retry: RetrySettings::default(),
        }
    }
}

/// SSH settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshSettings {
    /// Port the hosts listen on
    #[serde(default = "default_ssh_port")]
    pub port: u16,

    /// SHA-256 host key fingerprints keyed by host address, either as
    /// OpenSSH prints them (`SHA256:xOs3NJ...`) or as bare base64.
    /// Unlisted hosts are accepted with a warning.
    #[serde(default)]
    pub pinned_host_keys: HashMap<String, String>,
}

fn default_ssh_port() -> u16 {
    22
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            port: default_ssh_port(),
            pinned_host_keys: HashMap::new(),
        }
    }
}

/// Retry policy applied to each pipeline step
///
/// Remote steps are not idempotent, so the default is a single attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Attempts per step, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry, in seconds
    #[serde(default = "default_base_delay")]
    pub base_delay_secs: u64,

    /// Upper bound on the delay between retries, in seconds
    #[serde(default = "default_max_delay")]
    pub max_delay_secs: u64,
}

fn default_max_attempts() -> u32 {
    1
}

fn default_base_delay() -> u64 {
    2
}

fn default_max_delay() -> u64 {
    60
}

impl RetrySettings {
    /// Wait before retrying after failed attempt number `attempt` (1-based)
    ///
    /// Doubles from `base_delay_secs` and never exceeds `max_delay_secs`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
        let secs = self.base_delay_secs.saturating_mul(factor);
        Duration::from_secs(secs.min(self.max_delay_secs))
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_secs: default_base_delay(),
            max_delay_secs: default_max_delay(),
        }
    }
}

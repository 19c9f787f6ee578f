//! Logging setup
//!
//! Everything goes to stdout through a single `fmt` layer, plain or JSON.
//! `RUST_LOG` takes precedence over the level from the settings file.

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::errors::DeployError;

/// Log verbosity as written in the settings file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    #[serde(alias = "warning")]
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

/// Logging options
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Level used when `RUST_LOG` is unset
    pub level: LogLevel,

    /// One JSON object per line instead of human readable text
    pub json: bool,

    /// Include the emitting module in each line
    pub with_target: bool,
}

/// Install the global subscriber; fails if one is already installed
pub fn init_logging(options: LogOptions) -> Result<(), DeployError> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(options.level).into())
        .from_env_lossy();

    let json = options
        .json
        .then(|| fmt::layer().json().with_target(options.with_target));
    let text = (!options.json).then(|| fmt::layer().with_target(options.with_target));

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .try_init()
        .map_err(|e| DeployError::ConfigError(format!("logging: {}", e)))
}

//! Error types for the deployer

use std::fmt;

use thiserror::Error;

/// Main error type for the deployer
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Transfer error: {0}")]
    TransferError(String),

    #[error("Remote command `{command}` failed: {reason}")]
    CommandError { command: String, reason: String },

    #[error("Render error: {0}")]
    RenderError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure families surfaced to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Could not reach or log into the host
    Connection,

    /// A file could not be read locally or written remotely
    Transfer,

    /// A remote command could not run or exited non-zero
    Command,

    /// A script could not be rendered
    Render,

    /// Anything outside the remote provisioning path
    Local,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::Connection => "connection",
            FailureKind::Transfer => "transfer",
            FailureKind::Command => "command",
            FailureKind::Render => "render",
            FailureKind::Local => "local",
        };
        f.write_str(label)
    }
}

impl DeployError {
    /// Classify the error into its failure family
    pub fn kind(&self) -> FailureKind {
        match self {
            DeployError::ConnectionError(_) | DeployError::AuthError(_) => FailureKind::Connection,
            DeployError::TransferError(_) => FailureKind::Transfer,
            DeployError::CommandError { .. } => FailureKind::Command,
            DeployError::RenderError(_) => FailureKind::Render,
            DeployError::IoError(_)
            | DeployError::JsonError(_)
            | DeployError::ConfigError(_)
            | DeployError::Internal(_) => FailureKind::Local,
        }
    }
}

impl From<russh::Error> for DeployError {
    fn from(err: russh::Error) -> Self {
        DeployError::ConnectionError(err.to_string())
    }
}

impl From<russh_sftp::client::error::Error> for DeployError {
    fn from(err: russh_sftp::client::error::Error) -> Self {
        DeployError::TransferError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for DeployError {
    fn from(err: tokio::task::JoinError) -> Self {
        DeployError::Internal(format!("pipeline task aborted: {}", err))
    }
}

//! Remote sessions: file transfer and command execution on a host
//!
//! Every operation opens its own transport, authenticates, does its work
//! and tears the transport down again. Nothing is shared between calls.

pub mod interfaces;
pub mod memory;
pub mod ssh;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::errors::DeployError;
use crate::models::credential::Credential;
use crate::models::role::Role;

/// Size of each chunk streamed during a transfer
pub const MAX_PACKET: usize = 1 << 15;

/// What a completed transfer moved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReceipt {
    /// Remote path involved in the transfer
    pub remote_path: String,

    /// Bytes streamed
    pub bytes: u64,

    /// Hex SHA-256 of the streamed bytes
    pub sha256: String,
}

/// Output of a remote command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,

    /// Exit status reported by the host, if any
    pub exit_status: Option<u32>,
}

impl CommandOutput {
    /// Whether the command exited with status 0
    pub fn success(&self) -> bool {
        self.exit_status == Some(0)
    }

    /// Turn a failed exit into a command error for `command`
    pub fn check(self, command: &str) -> Result<Self, DeployError> {
        if self.success() {
            return Ok(self);
        }

        let reason = match self.exit_status {
            Some(code) => format!("exit status {}", code),
            None => "terminated without an exit status".to_string(),
        };
        let stderr = self.stderr.trim();
        let reason = if stderr.is_empty() {
            reason
        } else {
            format!("{}: {}", reason, last_line(stderr))
        };

        Err(DeployError::CommandError {
            command: command.to_string(),
            reason,
        })
    }
}

fn last_line(text: &str) -> &str {
    text.lines().last().unwrap_or(text)
}

/// An authenticated channel to one host
#[async_trait]
pub trait RemoteSession: Send + Sync {
    /// Copy the local file `source` to `destination` on the host
    async fn transfer(&self, source: &Path, destination: &str) -> Result<TransferReceipt, DeployError>;

    /// Run a shell command line and wait for it to exit
    async fn run(&self, command: &str) -> Result<CommandOutput, DeployError>;

    /// Copy the remote file `source` into the local file `destination`
    async fn download(&self, source: &str, destination: &Path) -> Result<TransferReceipt, DeployError>;
}

/// Hands out a session for a role's host
pub trait Connector: Send + Sync {
    fn session(&self, role: Role, credential: &Credential) -> Arc<dyn RemoteSession>;
}

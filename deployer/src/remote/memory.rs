//! In-memory session: a fake remote filesystem that records every call
//!
//! Used by the test suite to exercise pipelines without a network.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::DeployError;
use crate::models::credential::Credential;
use crate::models::role::Role;
use crate::remote::{CommandOutput, Connector, RemoteSession, TransferReceipt};
use crate::utils::sha256_hash;

/// One operation observed by a [`MemorySession`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Transfer { source: PathBuf, destination: String },
    Run { command: String },
    Download { source: String, destination: PathBuf },
}

impl RemoteCall {
    /// Remote path or command line, whichever the call carries
    pub fn remote_text(&self) -> &str {
        match self {
            RemoteCall::Transfer { destination, .. } => destination,
            RemoteCall::Run { command } => command,
            RemoteCall::Download { source, .. } => source,
        }
    }
}

#[derive(Default)]
struct State {
    files: HashMap<String, Vec<u8>>,
    calls: Vec<RemoteCall>,
    connected_as: Vec<String>,
    failing_destinations: HashMap<String, String>,
    failing_commands: HashMap<String, CommandOutput>,
    scripted_output: HashMap<String, String>,
}

/// A fake host
#[derive(Default)]
pub struct MemorySession {
    state: Mutex<State>,
    latency: Duration,
    journal: Option<Arc<Mutex<Vec<(Role, RemoteCall)>>>>,
    role: Option<Role>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every call, letting other tasks run
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Also append every call, tagged with `role`, to a shared journal
    pub fn with_journal(mut self, role: Role, journal: Arc<Mutex<Vec<(Role, RemoteCall)>>>) -> Self {
        self.role = Some(role);
        self.journal = Some(journal);
        self
    }

    /// Make transfers to `destination` fail with `reason`
    pub fn fail_transfer(&self, destination: &str, reason: &str) {
        self.lock()
            .failing_destinations
            .insert(destination.to_string(), reason.to_string());
    }

    /// Make `command` exit with `exit_status` and `stderr`
    pub fn fail_command(&self, command: &str, exit_status: u32, stderr: &str) {
        self.lock().failing_commands.insert(
            command.to_string(),
            CommandOutput {
                stdout: String::new(),
                stderr: stderr.to_string(),
                exit_status: Some(exit_status),
            },
        );
    }

    /// Give `command` a canned stdout
    pub fn script_output(&self, command: &str, stdout: &str) {
        self.lock()
            .scripted_output
            .insert(command.to_string(), stdout.to_string());
    }

    /// Place a file on the fake host
    pub fn put_file(&self, path: &str, contents: &[u8]) {
        self.lock().files.insert(path.to_string(), contents.to_vec());
    }

    /// Contents of a file on the fake host
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().files.get(path).cloned()
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    /// `user@address` of every credential this session was handed
    pub fn connected_as(&self) -> Vec<String> {
        self.lock().connected_as.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // a panicking test holding the lock should not hide its own failure
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn record(&self, call: RemoteCall) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let (Some(role), Some(journal)) = (self.role, &self.journal) {
            journal
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push((role, call.clone()));
        }
        self.lock().calls.push(call);
    }
}

#[async_trait]
impl RemoteSession for MemorySession {
    async fn transfer(&self, source: &Path, destination: &str) -> Result<TransferReceipt, DeployError> {
        self.record(RemoteCall::Transfer {
            source: source.to_path_buf(),
            destination: destination.to_string(),
        })
        .await;

        let failure = self.lock().failing_destinations.get(destination).cloned();
        if let Some(reason) = failure {
            return Err(DeployError::TransferError(format!("{}: {}", destination, reason)));
        }

        let contents = tokio::fs::read(source)
            .await
            .map_err(|e| DeployError::TransferError(format!("{}: {}", source.display(), e)))?;
        let receipt = TransferReceipt {
            remote_path: destination.to_string(),
            bytes: contents.len() as u64,
            sha256: sha256_hash(&contents),
        };
        self.lock().files.insert(destination.to_string(), contents);
        Ok(receipt)
    }

    async fn run(&self, command: &str) -> Result<CommandOutput, DeployError> {
        self.record(RemoteCall::Run {
            command: command.to_string(),
        })
        .await;

        let state = self.lock();
        if let Some(output) = state.failing_commands.get(command) {
            return Ok(output.clone());
        }
        Ok(CommandOutput {
            stdout: state.scripted_output.get(command).cloned().unwrap_or_default(),
            stderr: String::new(),
            exit_status: Some(0),
        })
    }

    async fn download(&self, source: &str, destination: &Path) -> Result<TransferReceipt, DeployError> {
        self.record(RemoteCall::Download {
            source: source.to_string(),
            destination: destination.to_path_buf(),
        })
        .await;

        let contents = self
            .file(source)
            .ok_or_else(|| DeployError::TransferError(format!("{}: no such file", source)))?;
        tokio::fs::write(destination, &contents)
            .await
            .map_err(|e| DeployError::TransferError(format!("{}: {}", destination.display(), e)))?;
        Ok(TransferReceipt {
            remote_path: source.to_string(),
            bytes: contents.len() as u64,
            sha256: sha256_hash(&contents),
        })
    }
}

/// Connector returning a fixed [`MemorySession`] per role
#[derive(Default)]
pub struct MemoryConnector {
    sessions: HashMap<Role, Arc<MemorySession>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `session` for `role`
    pub fn with_session(mut self, role: Role, session: Arc<MemorySession>) -> Self {
        self.sessions.insert(role, session);
        self
    }
}

impl Connector for MemoryConnector {
    fn session(&self, role: Role, credential: &Credential) -> Arc<dyn RemoteSession> {
        let session = self
            .sessions
            .get(&role)
            .cloned()
            .unwrap_or_else(|| Arc::new(MemorySession::new()));
        session.lock().connected_as.push(credential.target());
        session
    }
}

//! Per-role deployment pipeline
//!
//! Transfer archive, extract it, transfer the rendered script, remove the
//! local copy, run the script. Each step waits for the previous one and the
//! first failing step ends the pipeline.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::deploy::fsm::{PipelineEvent, PipelineFsm, Stage};
use crate::errors::{DeployError, FailureKind};
use crate::filesys::file::File;
use crate::models::role::Role;
use crate::remote::{CommandOutput, RemoteSession, TransferReceipt};
use crate::render::script::RenderedScript;
use crate::storage::settings::RetrySettings;

/// Outcome of one role's pipeline
pub type PipelineResult = Result<PipelineReport, PipelineFailure>;

/// What a successful pipeline did
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub role: Role,
    pub archive: TransferReceipt,
    pub script: TransferReceipt,
    pub output: CommandOutput,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Why and where a pipeline stopped
#[derive(Debug)]
pub struct PipelineFailure {
    pub role: Role,

    /// Failing stage; `None` when the pipeline task itself died
    pub stage: Option<Stage>,

    pub error: DeployError,
}

impl PipelineFailure {
    pub fn kind(&self) -> FailureKind {
        self.error.kind()
    }

    /// Remote state that may have been left behind
    ///
    /// A connection or authentication failure means the failing stage never
    /// touched the host, so only earlier stages left anything there.
    pub fn residue(&self) -> &'static str {
        match (self.stage, self.kind()) {
            (Some(stage), FailureKind::Connection) => stage.prior_residue(),
            (Some(stage), _) => stage.residue(),
            (None, _) => "unknown; the pipeline stopped unexpectedly",
        }
    }
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage {
            Some(stage) => write!(
                f,
                "{} pipeline failed during {} ({} error): {}",
                self.role,
                stage,
                self.kind(),
                self.error
            ),
            None => write!(f, "{} pipeline aborted: {}", self.role, self.error),
        }
    }
}

impl std::error::Error for PipelineFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Provisions one role's host
pub struct DeploymentPipeline {
    role: Role,
    session: Arc<dyn RemoteSession>,
    archive: File,
    script: RenderedScript,
    retry: RetrySettings,
    fsm: PipelineFsm,
}

impl DeploymentPipeline {
    pub fn new(
        session: Arc<dyn RemoteSession>,
        archive: File,
        script: RenderedScript,
        retry: RetrySettings,
    ) -> Self {
        Self {
            role: script.role,
            session,
            archive,
            script,
            retry,
            fsm: PipelineFsm::new(),
        }
    }

    /// Run every stage in order
    pub async fn run(mut self) -> PipelineResult {
        let role = self.role;
        let session = Arc::clone(&self.session);
        let started_at = Utc::now();

        info!("Transferring {} files", role);
        let archive_path = self.archive.path().to_path_buf();
        let remote_archive = role.remote_archive_path();
        let archive = self
            .step(Stage::TransferArchive, || {
                session.transfer(&archive_path, &remote_archive)
            })
            .await?;
        debug!(
            "Archive uploaded: {} bytes, sha256 {}",
            archive.bytes, archive.sha256
        );

        let extract = role.extract_command();
        self.step(Stage::ExtractArchive, || run_checked(&*session, &extract))
            .await?;

        let script_path = self.script.file.path().to_path_buf();
        let remote_script = role.remote_script_path();
        let script = self
            .step(Stage::TransferScript, || {
                session.transfer(&script_path, &remote_script)
            })
            .await?;

        self.begin(Stage::CleanupScript)?;
        if let Err(e) = self.script.file.delete().await {
            warn!(
                "Unable to remove local script {}: {}",
                self.script.file.path().display(),
                e
            );
        }
        info!("Transferring {} files: complete", role);

        info!("{} server build started", role);
        let execute = role.execute_command();
        let output = self
            .step(Stage::ExecuteScript, || run_checked(&*session, &execute))
            .await?;
        self.fsm
            .process(PipelineEvent::Complete)
            .map_err(|e| self.invariant_broken(Stage::ExecuteScript, e))?;
        info!("{} server deployed", role);

        Ok(PipelineReport {
            role,
            archive,
            script,
            output,
            started_at,
            finished_at: Utc::now(),
        })
    }

    fn begin(&mut self, stage: Stage) -> Result<(), PipelineFailure> {
        self.fsm
            .process(PipelineEvent::Begin(stage))
            .map_err(|e| self.invariant_broken(stage, e))
    }

    fn invariant_broken(&self, stage: Stage, message: String) -> PipelineFailure {
        PipelineFailure {
            role: self.role,
            stage: Some(stage),
            error: DeployError::Internal(message),
        }
    }

    /// Run one remote stage, retrying up to the configured attempt count
    async fn step<T, F, Fut>(&mut self, stage: Stage, op: F) -> Result<T, PipelineFailure>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, DeployError>>,
    {
        self.begin(stage)?;

        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    warn!(
                        "{} {} failed (attempt {}/{}), retrying in {:?}: {}",
                        self.role, stage, attempt, max_attempts, delay, e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!("{} {} failed: {}", self.role, stage, e);
                    let _ = self.fsm.process(PipelineEvent::Fail(e.to_string()));
                    return Err(PipelineFailure {
                        role: self.role,
                        stage: Some(stage),
                        error: e,
                    });
                }
            }
        }
    }
}

async fn run_checked(session: &dyn RemoteSession, command: &str) -> Result<CommandOutput, DeployError> {
    session.run(command).await?.check(command)
}

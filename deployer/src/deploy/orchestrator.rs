//! Runs both role pipelines concurrently

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, info_span, Instrument};

use crate::app::state::DeploymentContext;
use crate::deploy::pipeline::{DeploymentPipeline, PipelineFailure, PipelineResult};
use crate::errors::DeployError;
use crate::models::config::DeploymentConfig;
use crate::models::role::Role;
use crate::remote::Connector;
use crate::render::script::{RenderedScript, ScriptRenderer};

/// Results of both pipelines
#[derive(Debug)]
pub struct DeploymentOutcome {
    pub sensor: PipelineResult,
    pub application: PipelineResult,
}

impl DeploymentOutcome {
    pub fn get(&self, role: Role) -> &PipelineResult {
        match role {
            Role::Sensor => &self.sensor,
            Role::Application => &self.application,
        }
    }

    /// Whether both hosts were provisioned
    pub fn is_success(&self) -> bool {
        self.sensor.is_ok() && self.application.is_ok()
    }

    /// Failures, sensor first
    pub fn failures(&self) -> impl Iterator<Item = &PipelineFailure> {
        [&self.sensor, &self.application]
            .into_iter()
            .filter_map(|result| result.as_ref().err())
    }
}

/// Handle on launched pipelines
///
/// Awaiting [`DeploymentHandle::wait`] joins both; dropping the handle
/// leaves them running in the background.
#[derive(Debug)]
pub struct DeploymentHandle {
    sensor: JoinHandle<PipelineResult>,
    application: JoinHandle<PipelineResult>,
}

impl DeploymentHandle {
    /// Wait for both pipelines and collect their results
    pub async fn wait(self) -> DeploymentOutcome {
        let (sensor, application) = tokio::join!(self.sensor, self.application);
        DeploymentOutcome {
            sensor: flatten(Role::Sensor, sensor),
            application: flatten(Role::Application, application),
        }
    }

    /// Whether both pipelines have stopped
    pub fn is_finished(&self) -> bool {
        self.sensor.is_finished() && self.application.is_finished()
    }
}

fn flatten(role: Role, joined: Result<PipelineResult, tokio::task::JoinError>) -> PipelineResult {
    match joined {
        Ok(result) => result,
        Err(e) => {
            error!("{} pipeline task failed: {}", role, e);
            Err(PipelineFailure {
                role,
                stage: None,
                error: DeployError::from(e),
            })
        }
    }
}

/// Starts one pipeline per role against sessions from `C`
pub struct Orchestrator<C: Connector> {
    context: Arc<DeploymentContext>,
    connector: Arc<C>,
}

impl<C: Connector> Orchestrator<C> {
    pub fn new(context: Arc<DeploymentContext>, connector: Arc<C>) -> Self {
        Self { context, connector }
    }

    /// Render both role scripts before anything touches a host
    pub async fn prepare(&self, config: &DeploymentConfig) -> Result<Vec<RenderedScript>, DeployError> {
        ScriptRenderer::new(self.context.layout.clone())
            .render_all(config)
            .await
    }

    /// Spawn a pipeline for each role's script and return immediately
    ///
    /// Exactly one script per role is required; nothing is spawned otherwise.
    pub fn launch(&self, scripts: Vec<RenderedScript>) -> Result<DeploymentHandle, DeployError> {
        let mut sensor = None;
        let mut application = None;
        for script in scripts {
            let role = script.role;
            let slot = match role {
                Role::Sensor => &mut sensor,
                Role::Application => &mut application,
            };
            if slot.replace(script).is_some() {
                return Err(DeployError::Internal(format!("{} script given twice", role)));
            }
        }

        let (Some(sensor), Some(application)) = (sensor, application) else {
            return Err(DeployError::Internal(
                "both a sensor and an application script are required".to_string(),
            ));
        };

        let handle = DeploymentHandle {
            sensor: self.spawn(sensor),
            application: self.spawn(application),
        };
        info!("Launched sensor and application pipelines");
        Ok(handle)
    }

    fn spawn(&self, script: RenderedScript) -> JoinHandle<PipelineResult> {
        let role = script.role;
        let credential = self.context.credentials.get(role);
        let session = self.connector.session(role, credential);
        let pipeline = DeploymentPipeline::new(
            session,
            self.context.layout.archive_file(role),
            script,
            self.context.settings.retry.clone(),
        );

        let span = info_span!("pipeline", run = %self.context.run_id, role = %role);
        tokio::spawn(pipeline.run().instrument(span))
    }

    /// Render, launch and wait for both pipelines
    ///
    /// Render failures are returned before any remote activity.
    pub async fn deploy(&self, config: &DeploymentConfig) -> Result<DeploymentOutcome, DeployError> {
        let scripts = self.prepare(config).await?;
        let handle = self.launch(scripts)?;
        Ok(handle.wait().await)
    }
}

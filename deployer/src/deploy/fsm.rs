//! Finite State Machine tracking a pipeline through its stages

use std::fmt;

use serde::{Deserialize, Serialize};

/// Pipeline stage, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Upload the role archive to the staging directory
    TransferArchive,

    /// Unpack the archive on the host
    ExtractArchive,

    /// Upload the rendered script into the extracted directory
    TransferScript,

    /// Remove the local rendered script
    CleanupScript,

    /// Run the rendered script on the host
    ExecuteScript,
}

impl Stage {
    /// All stages, in order
    pub const ALL: [Stage; 5] = [
        Stage::TransferArchive,
        Stage::ExtractArchive,
        Stage::TransferScript,
        Stage::CleanupScript,
        Stage::ExecuteScript,
    ];

    /// The stage following this one
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::TransferArchive => Some(Stage::ExtractArchive),
            Stage::ExtractArchive => Some(Stage::TransferScript),
            Stage::TransferScript => Some(Stage::CleanupScript),
            Stage::CleanupScript => Some(Stage::ExecuteScript),
            Stage::ExecuteScript => None,
        }
    }

    /// Remote state left by earlier stages when this one never reached the host
    pub fn prior_residue(&self) -> &'static str {
        match self {
            Stage::TransferArchive => "none; nothing was written to the host",
            Stage::ExtractArchive => "the archive is uploaded to the staging directory",
            Stage::TransferScript => "the archive is uploaded and extracted",
            Stage::CleanupScript => "none; the host holds the extracted archive and script",
            Stage::ExecuteScript => {
                "the host holds the extracted archive and script; the script never started"
            }
        }
    }

    /// Remote state that may be left behind when this stage fails
    pub fn residue(&self) -> &'static str {
        match self {
            Stage::TransferArchive => "a partial archive may exist in the staging directory",
            Stage::ExtractArchive => {
                "the archive is uploaded; its extraction directory may be partially populated"
            }
            Stage::TransferScript => {
                "the archive is extracted; a partial deployment script may exist"
            }
            Stage::CleanupScript => "none; the host holds the extracted archive and script",
            Stage::ExecuteScript => {
                "the deployment script may have partially run; host state is unknown"
            }
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::TransferArchive => "archive transfer",
            Stage::ExtractArchive => "archive extraction",
            Stage::TransferScript => "script transfer",
            Stage::CleanupScript => "local cleanup",
            Stage::ExecuteScript => "script execution",
        };
        f.write_str(label)
    }
}

/// Pipeline state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    /// Nothing has run yet
    Pending,

    /// A stage is in progress
    Running(Stage),

    /// Every stage completed
    Deployed,

    /// A stage failed; later stages never ran
    Failed(Stage),
}

/// Pipeline event
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// A stage is starting
    Begin(Stage),

    /// The final stage completed
    Complete,

    /// The current stage failed
    Fail(String),
}

/// Pipeline FSM
#[derive(Debug, Clone)]
pub struct PipelineFsm {
    state: PipelineState,
    error: Option<String>,
    completed: Vec<Stage>,
}

impl PipelineFsm {
    /// Create a new FSM in pending state
    pub fn new() -> Self {
        Self {
            state: PipelineState::Pending,
            error: None,
            completed: Vec::new(),
        }
    }

    /// Get current state
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Stages that finished successfully
    pub fn completed(&self) -> &[Stage] {
        &self.completed
    }

    /// Process an event and transition state
    ///
    /// Stages may only begin in order, each after the previous one.
    pub fn process(&mut self, event: PipelineEvent) -> Result<(), String> {
        let new_state = match (&self.state, &event) {
            (PipelineState::Pending, PipelineEvent::Begin(Stage::TransferArchive)) => {
                PipelineState::Running(Stage::TransferArchive)
            }

            (PipelineState::Running(current), PipelineEvent::Begin(next))
                if current.next() == Some(*next) =>
            {
                self.completed.push(*current);
                PipelineState::Running(*next)
            }

            (PipelineState::Running(Stage::ExecuteScript), PipelineEvent::Complete) => {
                self.completed.push(Stage::ExecuteScript);
                PipelineState::Deployed
            }

            (PipelineState::Running(current), PipelineEvent::Fail(err)) => {
                self.error = Some(err.clone());
                PipelineState::Failed(*current)
            }

            // Invalid transitions
            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(())
    }
}

impl Default for PipelineFsm {
    fn default() -> Self {
        Self::new()
    }
}

//! FSM unit tests

use cozydeploy::deploy::fsm::{PipelineEvent, PipelineFsm, PipelineState, Stage};

#[test]
fn test_fsm_initial_state() {
    let fsm = PipelineFsm::new();
    assert_eq!(fsm.state(), &PipelineState::Pending);
    assert!(fsm.error().is_none());
    assert!(fsm.completed().is_empty());
}

#[test]
fn test_fsm_stages_run_in_order() {
    let mut fsm = PipelineFsm::new();

    fsm.process(PipelineEvent::Begin(Stage::TransferArchive)).unwrap();
    assert_eq!(fsm.state(), &PipelineState::Running(Stage::TransferArchive));

    // extraction cannot be skipped
    assert!(fsm.process(PipelineEvent::Begin(Stage::TransferScript)).is_err());
    assert_eq!(fsm.state(), &PipelineState::Running(Stage::TransferArchive));

    fsm.process(PipelineEvent::Begin(Stage::ExtractArchive)).unwrap();
    assert_eq!(fsm.completed(), &[Stage::TransferArchive]);
}

#[test]
fn test_fsm_cannot_start_midway() {
    let mut fsm = PipelineFsm::new();
    assert!(fsm.process(PipelineEvent::Begin(Stage::ExecuteScript)).is_err());
    assert!(fsm.process(PipelineEvent::Complete).is_err());
    assert_eq!(fsm.state(), &PipelineState::Pending);
}

#[test]
fn test_fsm_complete_only_after_execute() {
    let mut fsm = PipelineFsm::new();
    for stage in &Stage::ALL[..4] {
        fsm.process(PipelineEvent::Begin(*stage)).unwrap();
    }
    assert!(fsm.process(PipelineEvent::Complete).is_err());

    fsm.process(PipelineEvent::Begin(Stage::ExecuteScript)).unwrap();
    fsm.process(PipelineEvent::Complete).unwrap();
    assert_eq!(fsm.state(), &PipelineState::Deployed);
}

#[test]
fn test_fsm_failure_is_terminal() {
    let mut fsm = PipelineFsm::new();
    fsm.process(PipelineEvent::Begin(Stage::TransferArchive)).unwrap();
    fsm.process(PipelineEvent::Fail("connection refused".to_string()))
        .unwrap();

    assert_eq!(fsm.state(), &PipelineState::Failed(Stage::TransferArchive));
    assert_eq!(fsm.error(), Some("connection refused"));
    assert!(fsm.completed().is_empty());

    assert!(fsm.process(PipelineEvent::Begin(Stage::ExtractArchive)).is_err());
    assert!(fsm.process(PipelineEvent::Fail("again".to_string())).is_err());
}

#[test]
fn test_stage_residue() {
    assert!(Stage::TransferArchive.residue().contains("archive"));
    assert_ne!(
        Stage::ExtractArchive.residue(),
        Stage::ExecuteScript.residue()
    );
}

//! Concurrent deployment tests

use std::sync::{Arc, Mutex};
use std::time::Duration;

use cozydeploy::app::state::DeploymentContext;
use cozydeploy::deploy::fsm::Stage;
use cozydeploy::deploy::orchestrator::Orchestrator;
use cozydeploy::errors::FailureKind;
use cozydeploy::models::role::Role;
use cozydeploy::remote::memory::{MemoryConnector, MemorySession, RemoteCall};

use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

use crate::support;

struct Hosts {
    sensor: Arc<MemorySession>,
    application: Arc<MemorySession>,
}

fn orchestrator(dir: &TempDir, hosts: &Hosts) -> Orchestrator<MemoryConnector> {
    let connector = MemoryConnector::new()
        .with_session(Role::Sensor, hosts.sensor.clone())
        .with_session(Role::Application, hosts.application.clone());
    let context = DeploymentContext::new(support::credentials(), support::settings(dir.path()));
    Orchestrator::new(Arc::new(context), Arc::new(connector))
}

fn hosts() -> Hosts {
    Hosts {
        sensor: Arc::new(MemorySession::new()),
        application: Arc::new(MemorySession::new()),
    }
}

#[tokio::test]
async fn test_deploy_both_roles() {
    let dir = support::work_dir();
    let hosts = hosts();

    let outcome = assert_ok!(orchestrator(&dir, &hosts).deploy(&support::config()).await);
    assert!(outcome.is_success());
    assert_eq!(outcome.failures().count(), 0);

    let calls = hosts.application.calls();
    let transfers: Vec<&str> = calls
        .iter()
        .filter(|call| matches!(call, RemoteCall::Transfer { .. }))
        .map(RemoteCall::remote_text)
        .collect();
    assert_eq!(transfers, vec!["/tmp/App.tar.gz", "/tmp/application/AppDeploy.sh"]);

    let runs: Vec<&str> = calls
        .iter()
        .filter(|call| matches!(call, RemoteCall::Run { .. }))
        .map(RemoteCall::remote_text)
        .collect();
    assert_eq!(
        runs,
        vec![
            "tar xzvf /tmp/App.tar.gz -C /tmp",
            "cd /tmp/application; /bin/bash /tmp/application/AppDeploy.sh",
        ]
    );

    let script = String::from_utf8(hosts.application.file("/tmp/application/AppDeploy.sh").unwrap()).unwrap();
    assert!(script.contains("DOMAIN=example.local"));
}

#[tokio::test]
async fn test_roles_are_isolated() {
    let dir = support::work_dir();
    let hosts = hosts();

    assert_ok!(orchestrator(&dir, &hosts).deploy(&support::config()).await);

    assert_eq!(hosts.sensor.connected_as(), vec!["sensoradmin@10.1.1.10".to_string()]);
    assert_eq!(hosts.application.connected_as(), vec!["appadmin@10.1.1.20".to_string()]);

    for call in hosts.sensor.calls() {
        let text = call.remote_text();
        assert!(!text.contains("App"), "sensor host saw {}", text);
        assert!(!text.contains("application"), "sensor host saw {}", text);
    }
    for call in hosts.application.calls() {
        assert!(!call.remote_text().contains("Sensor"));
    }
}

#[tokio::test]
async fn test_pipelines_interleave() {
    let dir = support::work_dir();
    let journal = Arc::new(Mutex::new(Vec::new()));
    let latency = Duration::from_millis(20);
    let hosts = Hosts {
        sensor: Arc::new(
            MemorySession::new()
                .with_latency(latency)
                .with_journal(Role::Sensor, journal.clone()),
        ),
        application: Arc::new(
            MemorySession::new()
                .with_latency(latency)
                .with_journal(Role::Application, journal.clone()),
        ),
    };

    let outcome = orchestrator(&dir, &hosts).deploy(&support::config()).await.unwrap();
    assert!(outcome.is_success());

    let journal = journal.lock().unwrap();
    assert_eq!(journal.len(), 8);

    // the application pipeline starts before the sensor pipeline ends
    let first_application = journal
        .iter()
        .position(|(role, _)| *role == Role::Application)
        .unwrap();
    let last_sensor = journal
        .iter()
        .rposition(|(role, _)| *role == Role::Sensor)
        .unwrap();
    assert!(first_application < last_sensor);
}

#[tokio::test]
async fn test_one_failure_does_not_stop_the_other() {
    let dir = support::work_dir();
    let hosts = hosts();
    hosts.sensor.fail_transfer("/tmp/Sensor.tar.gz", "permission denied");

    let outcome = assert_ok!(orchestrator(&dir, &hosts).deploy(&support::config()).await);
    assert!(!outcome.is_success());

    let failure = outcome.get(Role::Sensor).as_ref().unwrap_err();
    assert_eq!(failure.stage, Some(Stage::TransferArchive));
    assert_eq!(failure.kind(), FailureKind::Transfer);
    assert_eq!(hosts.sensor.calls().len(), 1);

    assert!(outcome.get(Role::Application).is_ok());
    assert_eq!(hosts.application.calls().len(), 4);
}

#[tokio::test]
async fn test_render_failure_precedes_remote_activity() {
    let dir = support::work_dir();
    support::write(dir.path(), "AppDeploy.gtpl", b"HOST={{.Hostname}}\n");
    let hosts = hosts();

    let err = assert_err!(orchestrator(&dir, &hosts).deploy(&support::config()).await);
    assert_eq!(err.kind(), FailureKind::Render);

    assert!(hosts.sensor.calls().is_empty());
    assert!(hosts.application.calls().is_empty());
    assert!(hosts.sensor.connected_as().is_empty());
}

#[tokio::test]
async fn test_launch_requires_both_scripts() {
    let dir = support::work_dir();
    let hosts = hosts();
    let orchestrator = orchestrator(&dir, &hosts);

    let mut scripts = orchestrator.prepare(&support::config()).await.unwrap();
    scripts.retain(|script| script.role == Role::Sensor);

    assert_err!(orchestrator.launch(scripts));
    assert!(hosts.sensor.calls().is_empty());
}

#[tokio::test]
async fn test_handle_can_be_awaited_later() {
    let dir = support::work_dir();
    let hosts = hosts();
    let orchestrator = orchestrator(&dir, &hosts);

    let scripts = orchestrator.prepare(&support::config()).await.unwrap();
    let handle = orchestrator.launch(scripts).unwrap();
    let outcome = handle.wait().await;

    assert!(outcome.is_success());
    let report = outcome.get(Role::Sensor).as_ref().unwrap();
    assert_eq!(report.script.remote_path, "/tmp/Sensor/SensorDeploy.sh");
    assert!(report.finished_at >= report.started_at);
}

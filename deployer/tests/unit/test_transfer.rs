//! In-memory session tests

use std::sync::Arc;

use cozydeploy::errors::FailureKind;
use cozydeploy::models::credential::Credential;
use cozydeploy::models::role::Role;
use cozydeploy::remote::memory::{MemoryConnector, MemorySession, RemoteCall};
use cozydeploy::remote::{Connector, RemoteSession};
use cozydeploy::utils::sha256_hash;

use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_transfer_then_download() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("payload.bin");
    let contents: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
    std::fs::write(&source, &contents).unwrap();

    let session = MemorySession::new();
    let uploaded = assert_ok!(session.transfer(&source, "/tmp/payload.bin").await);
    assert_eq!(uploaded.bytes, contents.len() as u64);
    assert_eq!(uploaded.sha256, sha256_hash(&contents));

    let copy = dir.path().join("copy.bin");
    let downloaded = assert_ok!(session.download("/tmp/payload.bin", &copy).await);
    assert_eq!(downloaded.sha256, uploaded.sha256);
    assert_eq!(std::fs::read(&copy).unwrap(), contents);
}

#[tokio::test]
async fn test_transfer_missing_local_file() {
    let dir = tempfile::tempdir().unwrap();
    let session = MemorySession::new();

    let err = assert_err!(
        session
            .transfer(&dir.path().join("absent.tar.gz"), "/tmp/absent.tar.gz")
            .await
    );
    assert_eq!(err.kind(), FailureKind::Transfer);
    assert!(session.file("/tmp/absent.tar.gz").is_none());
}

#[tokio::test]
async fn test_run_records_command() {
    let session = MemorySession::new();
    session.fail_command("false", 1, "nope");

    let output = assert_ok!(session.run("true").await);
    assert!(output.success());

    let output = assert_ok!(session.run("false").await);
    assert!(!output.success());
    let err = assert_err!(output.check("false"));
    assert_eq!(err.kind(), FailureKind::Command);
    assert!(err.to_string().contains("exit status 1: nope"));

    assert_eq!(
        session.calls(),
        vec![
            RemoteCall::Run {
                command: "true".to_string()
            },
            RemoteCall::Run {
                command: "false".to_string()
            },
        ]
    );
}

#[test]
fn test_connector_hands_out_role_session() {
    let sensor = Arc::new(MemorySession::new());
    let application = Arc::new(MemorySession::new());
    let connector = MemoryConnector::new()
        .with_session(Role::Sensor, sensor.clone())
        .with_session(Role::Application, application.clone());

    connector.session(Role::Sensor, &Credential::new("10.0.0.1", "root", "pw"));
    connector.session(
        Role::Application,
        &Credential::new("10.0.0.2", "admin", "pw"),
    );

    assert_eq!(sensor.connected_as(), vec!["root@10.0.0.1".to_string()]);
    assert_eq!(application.connected_as(), vec!["admin@10.0.0.2".to_string()]);
}

//! Script rendering tests

use cozydeploy::errors::FailureKind;
use cozydeploy::models::role::Role;
use cozydeploy::render::script::ScriptRenderer;
use cozydeploy::render::template::render;
use cozydeploy::storage::layout::StorageLayout;

use crate::support;

#[test]
fn test_render_is_deterministic() {
    let config = support::config();
    let first = render(support::APP_TEMPLATE, &config).unwrap();
    let second = render(support::APP_TEMPLATE, &config).unwrap();
    assert_eq!(first, second);
    assert!(first.contains("DOMAIN=example.local\n"));
    assert!(first.contains("ES_HEAP=16g\n"));
    assert!(first.contains("IFACE=eth0\n"));
}

#[test]
fn test_render_rejects_unknown_field() {
    let err = render("NAME={{.Hostname}}\n", &support::config()).unwrap_err();
    assert_eq!(err.kind(), FailureKind::Render);
    assert!(err.to_string().contains("Hostname"));
}

#[tokio::test]
async fn test_render_role_writes_script() {
    let dir = support::work_dir();
    let renderer = ScriptRenderer::new(StorageLayout::new(dir.path()));

    let script = renderer
        .render_role(Role::Sensor, &support::config())
        .await
        .unwrap();

    assert_eq!(script.role, Role::Sensor);
    assert_eq!(script.file.path(), dir.path().join("SensorDeploy.sh"));
    let contents = script.file.read_string().await.unwrap();
    assert_eq!(
        contents,
        "#!/bin/bash\nIFACE=eth1\nWORKERS=4\nNET=10.1.1.0/24\n"
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_rendered_script_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = support::work_dir();
    let renderer = ScriptRenderer::new(StorageLayout::new(dir.path()));
    let script = renderer
        .render_role(Role::Application, &support::config())
        .await
        .unwrap();

    let mode = std::fs::metadata(script.file.path())
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[tokio::test]
async fn test_render_all_missing_template() {
    let dir = support::work_dir();
    std::fs::remove_file(dir.path().join("AppDeploy.gtpl")).unwrap();
    let renderer = ScriptRenderer::new(StorageLayout::new(dir.path()));

    let err = renderer.render_all(&support::config()).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::Render);

    // the sensor script rendered first is removed again
    assert!(!dir.path().join("SensorDeploy.sh").exists());
}

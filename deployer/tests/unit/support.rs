//! Shared fixtures: a work directory with archives and templates

use std::path::Path;

use tempfile::TempDir;

use cozydeploy::models::config::DeploymentConfig;
use cozydeploy::models::credential::{Credential, CredentialStore};
use cozydeploy::models::form::FormData;
use cozydeploy::models::role::Role;
use cozydeploy::storage::settings::Settings;

pub const SENSOR_TEMPLATE: &str = "#!/bin/bash\n\
IFACE={{.CollectionInterface}}\n\
WORKERS={{.Workers}}\n\
NET={{.IP}}.0/24\n";

pub const APP_TEMPLATE: &str = "#!/bin/bash\n\
DOMAIN={{.Domain}}\n\
IPA_PASSWORD={{.IpaPassword}}\n\
ES_HEAP={{.ESRam}}\n\
IFACE={{ .AppInterface }}\n";

/// Work directory holding both archives and both templates
pub fn work_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), Role::Sensor.archive_name(), b"sensor archive bytes");
    write(dir.path(), Role::Application.archive_name(), b"application archive bytes");
    write(dir.path(), Role::Sensor.template_name(), SENSOR_TEMPLATE.as_bytes());
    write(dir.path(), Role::Application.template_name(), APP_TEMPLATE.as_bytes());
    dir
}

pub fn write(dir: &Path, name: &str, contents: &[u8]) {
    std::fs::write(dir.join(name), contents).unwrap();
}

pub fn settings(dir: &Path) -> Settings {
    Settings {
        work_dir: dir.to_path_buf(),
        ..Default::default()
    }
}

pub fn credentials() -> CredentialStore {
    CredentialStore::new(
        Credential::new("10.1.1.10", "sensoradmin", "sensor-secret"),
        Credential::new("10.1.1.20", "appadmin", "app-secret"),
    )
}

pub fn config() -> DeploymentConfig {
    let form: FormData = [
        ("ip", "10.1.1"),
        ("workers", "4"),
        ("interface", "eth1"),
        ("domain", "example.local"),
        ("ipapassword", "ipa-secret"),
        ("memory", "16"),
        ("appinterface", "eth0"),
    ]
    .into_iter()
    .collect();
    DeploymentConfig::from_form(&form).unwrap()
}

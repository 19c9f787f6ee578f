//! Deployment roles and their fixed remote conventions
//!
//! The archive names, remote paths and commands below are what the
//! provisioning images expect. Changing any of them breaks compatibility
//! with existing archives.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Directory on the remote host that receives archives
pub const REMOTE_STAGING_DIR: &str = "/tmp";

/// One of the two provisioned hosts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Network sensor (packet capture, Bro workers)
    Sensor,

    /// Application server (search index, identity service)
    Application,
}

impl Role {
    /// Both roles, in launch order
    pub const ALL: [Role; 2] = [Role::Sensor, Role::Application];

    /// Human readable name used in progress lines
    pub fn label(&self) -> &'static str {
        match self {
            Role::Sensor => "Sensor",
            Role::Application => "Application",
        }
    }

    /// Prepackaged archive shipped to the host
    pub fn archive_name(&self) -> &'static str {
        match self {
            Role::Sensor => "Sensor.tar.gz",
            Role::Application => "App.tar.gz",
        }
    }

    /// Operator-authored script template
    pub fn template_name(&self) -> &'static str {
        match self {
            Role::Sensor => "SensorDeploy.gtpl",
            Role::Application => "AppDeploy.gtpl",
        }
    }

    /// Rendered script file name, locally and remotely
    pub fn script_name(&self) -> &'static str {
        match self {
            Role::Sensor => "SensorDeploy.sh",
            Role::Application => "AppDeploy.sh",
        }
    }

    /// Directory the archive extracts into
    pub fn remote_dir(&self) -> &'static str {
        match self {
            Role::Sensor => "/tmp/Sensor",
            Role::Application => "/tmp/application",
        }
    }

    /// Remote path the archive is uploaded to
    pub fn remote_archive_path(&self) -> String {
        format!("{}/{}", REMOTE_STAGING_DIR, self.archive_name())
    }

    /// Remote path the rendered script is uploaded to
    pub fn remote_script_path(&self) -> String {
        format!("{}/{}", self.remote_dir(), self.script_name())
    }

    /// Command unpacking the uploaded archive
    pub fn extract_command(&self) -> String {
        format!(
            "tar xzvf {} -C {}",
            self.remote_archive_path(),
            REMOTE_STAGING_DIR
        )
    }

    /// Command running the rendered script from inside the extracted directory
    pub fn execute_command(&self) -> String {
        format!(
            "cd {}; /bin/bash {}",
            self.remote_dir(),
            self.remote_script_path()
        )
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

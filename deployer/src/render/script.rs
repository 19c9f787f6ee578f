//! Rendering role templates into deployable scripts

use tracing::{debug, info};

use crate::errors::DeployError;
use crate::filesys::file::File;
use crate::models::config::DeploymentConfig;
use crate::models::role::Role;
use crate::render::template::render;
use crate::storage::layout::StorageLayout;

/// A rendered script on local disk, waiting to be shipped
#[derive(Debug, Clone)]
pub struct RenderedScript {
    pub role: Role,
    pub file: File,
}

/// Renders role templates found in the work directory
#[derive(Debug, Clone)]
pub struct ScriptRenderer {
    layout: StorageLayout,
}

impl ScriptRenderer {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    /// Render the role's template into `<Role>Deploy.sh` next to it
    ///
    /// The rendered file holds secrets from the configuration, so it is
    /// restricted to the owner.
    pub async fn render_role(
        &self,
        role: Role,
        config: &DeploymentConfig,
    ) -> Result<RenderedScript, DeployError> {
        let template_file = self.layout.template_file(role);
        debug!("Reading template: {}", template_file.path().display());
        let template = template_file.read_string().await.map_err(|e| {
            DeployError::RenderError(format!(
                "unable to read template {}: {}",
                template_file.path().display(),
                e
            ))
        })?;

        let contents = render(&template, config).map_err(|e| match e {
            DeployError::RenderError(msg) => DeployError::RenderError(format!(
                "{}: {}",
                template_file.path().display(),
                msg
            )),
            other => other,
        })?;

        let script_file = self.layout.script_file(role);
        let write_err = |e: DeployError| {
            DeployError::RenderError(format!(
                "unable to write {}: {}",
                script_file.path().display(),
                e
            ))
        };
        script_file.write_string(&contents).await.map_err(write_err)?;
        script_file.set_permissions_600().await.map_err(write_err)?;

        info!("Rendered {} script: {}", role, script_file.path().display());
        Ok(RenderedScript {
            role,
            file: script_file,
        })
    }

    /// Render both role scripts; nothing is returned unless both succeed
    pub async fn render_all(
        &self,
        config: &DeploymentConfig,
    ) -> Result<Vec<RenderedScript>, DeployError> {
        let mut scripts = Vec::with_capacity(Role::ALL.len());
        for role in Role::ALL {
            match self.render_role(role, config).await {
                Ok(script) => scripts.push(script),
                Err(e) => {
                    for rendered in &scripts {
                        let _ = rendered.file.delete().await;
                    }
                    return Err(e);
                }
            }
        }
        Ok(scripts)
    }
}

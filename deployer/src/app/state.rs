//! Per-run deployment context

use tracing::info;

use crate::models::credential::CredentialStore;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::Settings;
use crate::utils::generate_uuid;

/// Everything a deployment run needs besides the rendered scripts
///
/// Built once per run and shared read-only with both pipelines.
#[derive(Debug)]
pub struct DeploymentContext {
    /// Identifier tagging every log line of this run
    pub run_id: String,

    /// Credentials for both hosts
    pub credentials: CredentialStore,

    /// Where archives, templates and rendered scripts live
    pub layout: StorageLayout,

    /// Settings the run was started with
    pub settings: Settings,
}

impl DeploymentContext {
    pub fn new(credentials: CredentialStore, settings: Settings) -> Self {
        let run_id = generate_uuid();
        info!("Initializing deployment run {}", run_id);

        Self {
            run_id,
            credentials,
            layout: StorageLayout::new(settings.work_dir.clone()),
            settings,
        }
    }
}

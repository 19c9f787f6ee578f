//! Top-level run flow: read the forms, then deploy or discover

use std::sync::Arc;

use colored::Colorize;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::app::options::{AppOptions, Mode};
use crate::app::state::DeploymentContext;
use crate::deploy::orchestrator::{DeploymentOutcome, Orchestrator};
use crate::errors::DeployError;
use crate::filesys::file::File;
use crate::models::config::DeploymentConfig;
use crate::models::credential::CredentialStore;
use crate::models::form::FormData;
use crate::models::role::Role;
use crate::remote::interfaces::{address_prefix, list_interfaces};
use crate::remote::ssh::SshConnector;
use crate::remote::Connector;
use crate::storage::settings::Settings;

/// Run the deployer; `Ok(false)` means a pipeline failed
pub async fn run(options: AppOptions, settings: Settings) -> Result<bool, DeployError> {
    let connect_form: FormData = File::new(&options.connect_form).read_json().await.map_err(|e| {
        DeployError::ConfigError(format!(
            "unable to read connection form {}: {}",
            options.connect_form.display(),
            e
        ))
    })?;
    let credentials = CredentialStore::from_form(&connect_form)?;
    let connector = Arc::new(SshConnector::new(&settings.ssh));

    match options.mode {
        Mode::Interfaces => {
            let report = discover(&credentials, connector.as_ref()).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(true)
        }
        Mode::Deploy => {
            let configure_form: FormData = File::new(&options.configure_form)
                .read_json()
                .await
                .map_err(|e| {
                    DeployError::ConfigError(format!(
                        "unable to read configuration form {}: {}",
                        options.configure_form.display(),
                        e
                    ))
                })?;
            let config = DeploymentConfig::from_form(&configure_form)?;

            let context = Arc::new(DeploymentContext::new(credentials, settings));
            let orchestrator = Orchestrator::new(context, connector);
            info!("Running installation scripts");
            let outcome = orchestrator.deploy(&config).await?;
            print_summary(&outcome);
            Ok(outcome.is_success())
        }
    }
}

/// Interfaces found on both hosts
#[derive(Debug, Clone, Serialize)]
pub struct InterfaceReport {
    /// Suggested network prefix, from the sensor address
    pub ip: Option<String>,

    /// Sensor interfaces, sorted
    pub interface: Vec<String>,

    /// Application server interfaces, sorted
    pub app_interface: Vec<String>,
}

/// List interfaces on both hosts concurrently
pub async fn discover<C: Connector>(
    credentials: &CredentialStore,
    connector: &C,
) -> Result<InterfaceReport, DeployError> {
    let sensor_credential = credentials.get(Role::Sensor);
    let sensor = connector.session(Role::Sensor, sensor_credential);
    let application = connector.session(Role::Application, credentials.get(Role::Application));

    let (interface, app_interface) = tokio::join!(
        list_interfaces(sensor.as_ref()),
        list_interfaces(application.as_ref())
    );

    let ip = address_prefix(&sensor_credential.address);
    if ip.is_none() {
        warn!(
            "Sensor address {} is not a dotted IPv4 address; no network prefix suggested",
            sensor_credential.address
        );
    }

    Ok(InterfaceReport {
        ip,
        interface: interface?,
        app_interface: app_interface?,
    })
}

/// Print one line per role, followed by failure details
pub fn print_summary(outcome: &DeploymentOutcome) {
    println!();
    for role in Role::ALL {
        match outcome.get(role) {
            Ok(report) => {
                let elapsed = report.finished_at - report.started_at;
                println!(
                    "{} {} server deployed in {}s",
                    "[OK]".green().bold(),
                    role,
                    elapsed.num_seconds()
                );
            }
            Err(failure) => {
                error!("{}", failure);
                println!("{} {}", "[FAILED]".red().bold(), failure);
                println!("         remote state: {}", failure.residue());
            }
        }
    }
}

//! cozy-deploy - Entry Point
//!
//! Provisions a CozyStack sensor and application server over SSH.

use std::collections::HashMap;
use std::env;
use std::process::ExitCode;

use cozydeploy::app::options::AppOptions;
use cozydeploy::app::run::run;
use cozydeploy::filesys::file::File;
use cozydeploy::logs::{init_logging, LogOptions};
use cozydeploy::storage::settings::Settings;
use cozydeploy::utils::version_info;

use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(_) => println!("{}", version.version),
        }
        return ExitCode::SUCCESS;
    }

    let options = AppOptions::from_args(&cli_args);

    // Retrieve the settings file
    let mut settings = match &options.settings_file {
        Some(path) => match File::new(path).read_json::<Settings>().await {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Unable to read settings file {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => Settings::default(),
    };
    if let Some(work_dir) = &options.work_dir {
        settings.work_dir = work_dir.clone();
    }

    // Initialize logging
    let log_options = LogOptions {
        level: settings.log_level,
        json: settings.json_logs,
        ..Default::default()
    };
    if let Err(e) = init_logging(log_options) {
        eprintln!("Failed to initialize logging: {e}");
    }

    info!("cozy-deploy {} ({})", version.version, version.git_hash);
    match run(options, settings).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("cozy-deploy failed: {e}");
            ExitCode::FAILURE
        }
    }
}

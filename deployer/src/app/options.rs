//! Command line options

use std::collections::HashMap;
use std::path::PathBuf;

/// What the process was asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Render, transfer and run the deployment scripts on both hosts
    Deploy,

    /// List each host's network interfaces
    Interfaces,
}

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub mode: Mode,

    /// Settings file; defaults are used when absent
    pub settings_file: Option<PathBuf>,

    /// Connection form (host credentials)
    pub connect_form: PathBuf,

    /// Configuration form (script values)
    pub configure_form: PathBuf,

    /// Overrides the work directory from the settings file
    pub work_dir: Option<PathBuf>,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            mode: Mode::Deploy,
            settings_file: None,
            connect_form: PathBuf::from("connect.json"),
            configure_form: PathBuf::from("configure.json"),
            work_dir: None,
        }
    }
}

impl AppOptions {
    /// Build options from `--key=value` arguments
    pub fn from_args(args: &HashMap<String, String>) -> Self {
        let defaults = Self::default();
        let mode = if args.contains_key("interfaces") {
            Mode::Interfaces
        } else {
            Mode::Deploy
        };

        Self {
            mode,
            settings_file: args.get("settings").map(PathBuf::from),
            connect_form: args
                .get("connect")
                .map(PathBuf::from)
                .unwrap_or(defaults.connect_form),
            configure_form: args
                .get("configure")
                .map(PathBuf::from)
                .unwrap_or(defaults.configure_form),
            work_dir: args.get("work-dir").map(PathBuf::from),
        }
    }
}

//! Application wiring: options, per-run context and the run flow

pub mod options;
pub mod run;
pub mod state;

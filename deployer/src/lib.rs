//! cozy-deploy library
//!
//! Core modules for provisioning the sensor and application servers.

pub mod app;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod logs;
pub mod models;
pub mod remote;
pub mod render;
pub mod storage;
pub mod utils;

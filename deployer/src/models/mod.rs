//! Data model: roles, credentials and configuration

pub mod config;
pub mod credential;
pub mod form;
pub mod role;

//! Deployment script rendering

pub mod script;
pub mod template;

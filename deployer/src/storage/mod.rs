//! Local storage: settings and work directory layout

pub mod layout;
pub mod settings;

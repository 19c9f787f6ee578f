//! Local work directory layout

use std::path::{Path, PathBuf};

use crate::filesys::file::File;
use crate::models::role::Role;

/// Where the per-role artifacts live on the operator's machine
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Base directory for archives, templates and rendered scripts
    pub base_dir: PathBuf,
}

impl StorageLayout {
    /// Create a new storage layout
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Prepackaged archive for the role
    pub fn archive_file(&self, role: Role) -> File {
        File::new(self.base_dir.join(role.archive_name()))
    }

    /// Script template for the role
    pub fn template_file(&self, role: Role) -> File {
        File::new(self.base_dir.join(role.template_name()))
    }

    /// Rendered script for the role
    pub fn script_file(&self, role: Role) -> File {
        File::new(self.base_dir.join(role.script_name()))
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self::new(".")
    }
}

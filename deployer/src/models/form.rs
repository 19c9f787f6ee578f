//! Operator form submissions
//!
//! The front end posts two flat forms: one with connection details, one
//! with deployment configuration. Both arrive here as field name to text.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::DeployError;

/// A submitted form, field name to value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormData {
    fields: HashMap<String, String>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Get a field that must be present and non-blank
    pub fn required(&self, name: &str) -> Result<&str, DeployError> {
        match self.get(name) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(DeployError::ConfigError(format!(
                "missing form field `{}`",
                name
            ))),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for FormData
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut form = FormData::new();
        for (name, value) in iter {
            form.insert(name, value);
        }
        form
    }
}

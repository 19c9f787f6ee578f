//! Deployment configuration shared by both role scripts

use secrecy::{ExposeSecret, SecretString};

use crate::errors::DeployError;
use crate::models::form::FormData;

/// Smallest search index heap the index engine accepts, in gigabytes
pub const MIN_INDEX_MEMORY_GB: u32 = 2;

/// Largest search index heap the index engine accepts, in gigabytes
pub const MAX_INDEX_MEMORY_GB: u32 = 31;

/// Values substituted into the role script templates
///
/// Template placeholders use the field names returned by
/// [`DeploymentConfig::FIELDS`], e.g. `{{.Domain}}`.
#[derive(Debug, Clone)]
pub struct DeploymentConfig {
    /// Network address prefix, first three octets
    pub ip: String,

    /// Number of Bro workers on the sensor
    pub workers: String,

    /// Sensor collection interface
    pub collection_interface: String,

    /// Internal domain name
    pub domain: String,

    /// Identity service (FreeIPA) admin password
    pub ipa_password: SecretString,

    /// Application server interface hosting services
    pub app_interface: String,

    /// Search index heap, e.g. `16g`
    pub es_ram: String,
}

impl DeploymentConfig {
    /// Placeholder names understood by the templates
    pub const FIELDS: [&'static str; 7] = [
        "IP",
        "Workers",
        "CollectionInterface",
        "Domain",
        "IpaPassword",
        "AppInterface",
        "ESRam",
    ];

    /// Build the configuration from the configuration form
    ///
    /// `memory` is given in whole gigabytes and must be within
    /// [`MIN_INDEX_MEMORY_GB`]..=[`MAX_INDEX_MEMORY_GB`].
    pub fn from_form(form: &FormData) -> Result<Self, DeployError> {
        let memory = form.required("memory")?.trim();
        let gigabytes: u32 = memory.parse().map_err(|_| {
            DeployError::ConfigError(format!("memory must be a whole number of gigabytes, got `{}`", memory))
        })?;
        if !(MIN_INDEX_MEMORY_GB..=MAX_INDEX_MEMORY_GB).contains(&gigabytes) {
            return Err(DeployError::ConfigError(format!(
                "memory must be between {} and {} gigabytes, got {}",
                MIN_INDEX_MEMORY_GB, MAX_INDEX_MEMORY_GB, gigabytes
            )));
        }

        Ok(Self {
            ip: form.required("ip")?.to_string(),
            workers: form.required("workers")?.to_string(),
            collection_interface: form.required("interface")?.to_string(),
            domain: form.required("domain")?.to_string(),
            ipa_password: SecretString::from(form.required("ipapassword")?.to_string()),
            app_interface: form.required("appinterface")?.to_string(),
            es_ram: format!("{}g", gigabytes),
        })
    }

    /// Look up a template field by name
    pub fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "IP" => &self.ip,
            "Workers" => &self.workers,
            "CollectionInterface" => &self.collection_interface,
            "Domain" => &self.domain,
            "IpaPassword" => return Some(self.ipa_password.expose_secret()),
            "AppInterface" => &self.app_interface,
            "ESRam" => &self.es_ram,
            _ => return None,
        };
        Some(value.as_str())
    }
}

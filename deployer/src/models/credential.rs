//! SSH credentials for the two provisioned hosts

use secrecy::{ExposeSecret, SecretString};

use crate::errors::DeployError;
use crate::models::form::FormData;
use crate::models::role::Role;

/// Connection parameters for one host
///
/// The secret is only ever held in memory and is redacted from `Debug`.
#[derive(Debug, Clone)]
pub struct Credential {
    /// Host identifier (IP or hostname)
    pub address: String,

    /// Login principal
    pub user: String,

    secret: SecretString,
}

impl Credential {
    pub fn new(
        address: impl Into<String>,
        user: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            user: user.into(),
            secret: SecretString::from(secret.into()),
        }
    }

    /// Password used for authentication
    pub fn secret(&self) -> &str {
        self.secret.expose_secret()
    }

    /// `user@address`, safe to log
    pub fn target(&self) -> String {
        format!("{}@{}", self.user, self.address)
    }
}

/// Credentials for both roles, fixed for the duration of a run
#[derive(Debug, Clone)]
pub struct CredentialStore {
    sensor: Credential,
    application: Credential,
}

impl CredentialStore {
    pub fn new(sensor: Credential, application: Credential) -> Self {
        Self {
            sensor,
            application,
        }
    }

    /// Build the store from the connection form
    ///
    /// Fields: `ip`, `user`, `password` for the sensor and `appip`,
    /// `appuser`, `apppassword` for the application server.
    pub fn from_form(form: &FormData) -> Result<Self, DeployError> {
        let sensor = Credential::new(
            form.required("ip")?,
            form.required("user")?,
            form.required("password")?,
        );
        let application = Credential::new(
            form.required("appip")?,
            form.required("appuser")?,
            form.required("apppassword")?,
        );
        Ok(Self::new(sensor, application))
    }

    pub fn get(&self, role: Role) -> &Credential {
        match role {
            Role::Sensor => &self.sensor,
            Role::Application => &self.application,
        }
    }
}

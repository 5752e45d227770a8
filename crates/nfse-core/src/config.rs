//! # Configuration
//!
//! Deserializable configuration records. These are deliberately loose
//! (every field optional) so that [`ProviderIdentity::from_config`] can
//! report *which* field is missing instead of a generic parse error.
//!
//! Keys are accepted in camelCase (`taxId`, `municipalRegistration`,
//! `municipalCode`, `legalName`, `environment`) and under the legacy names
//! used by existing deployments (`cnpj`, `im`, `cmun`, `razao`, `tpamb`).
//!
//! [`ProviderIdentity::from_config`]: crate::identity::ProviderIdentity::from_config

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::identity::ProviderIdentity;

/// Default transport timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Raw provider configuration as read from disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// CNPJ of the provider.
    #[serde(default, alias = "cnpj")]
    pub tax_id: Option<String>,
    /// Municipal registration.
    #[serde(default, alias = "im")]
    pub municipal_registration: Option<String>,
    /// IBGE municipal code.
    #[serde(default, alias = "cmun")]
    pub municipal_code: Option<String>,
    /// Legal name.
    #[serde(default, alias = "razao")]
    pub legal_name: Option<String>,
    /// Environment code: 1 = production, 2 = homologation.
    #[serde(default, alias = "tpamb")]
    pub environment: Option<u8>,
}

impl ProviderConfig {
    /// Parse a provider record from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate the record into a [`ProviderIdentity`].
    pub fn identity(&self) -> Result<ProviderIdentity, ConfigError> {
        ProviderIdentity::from_config(self)
    }
}

/// Deployment configuration for one client instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NfseConfig {
    /// Provider identity record.
    pub provider: ProviderConfig,
    /// Directory holding the authority's XSD files.
    pub schema_dir: PathBuf,
    /// Transport timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl NfseConfig {
    /// Load configuration from a YAML (`.yaml`, `.yml`) or JSON (`.json`) file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] for unknown extensions or malformed content.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            Some("json") => Self::from_json_str(&content),
            other => Err(ConfigError::Parse(format!(
                "unsupported configuration format {other:?} for {}",
                path.display()
            ))),
        }
    }

    /// Parse configuration from a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Parse configuration from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate the provider record into a [`ProviderIdentity`].
    pub fn identity(&self) -> Result<ProviderIdentity, ConfigError> {
        self.provider.identity()
    }
}

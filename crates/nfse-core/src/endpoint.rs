//! # Endpoint Catalog
//!
//! Per-municipality web-service endpoints, keyed by IBGE municipal code.
//! The catalog is data owned by the deployment; this module only parses it
//! and picks the URL and SOAP namespace for an environment.
//!
//! The on-disk format is the one published alongside the authority's
//! schemas (`urls_webservices.json`):
//!
//! ```json
//! { "4125506": { "municipio": "...", "uf": "PR", "homologacao": "...",
//!                "producao": "...", "version": "3",
//!                "homologacao_soapns": "...", "producao_soapns": "..." } }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::identity::Environment;

/// Catalog bundled with the crate.
const BUILTIN_CATALOG: &str = include_str!("../storage/urls_webservices.json");

/// Endpoints of one municipality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MunicipalityEndpoints {
    /// Municipality name.
    #[serde(rename = "municipio")]
    pub name: String,
    /// State (UF) abbreviation.
    #[serde(rename = "uf")]
    pub state: String,
    /// Homologation service URL.
    #[serde(rename = "homologacao")]
    pub homologation_url: String,
    /// Production service URL.
    #[serde(rename = "producao")]
    pub production_url: String,
    /// Service layout version.
    pub version: String,
    /// SOAP namespace in homologation.
    #[serde(rename = "homologacao_soapns")]
    pub homologation_namespace: String,
    /// SOAP namespace in production.
    #[serde(rename = "producao_soapns")]
    pub production_namespace: String,
}

/// Endpoint selected for one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    /// Service URL requests are posted to.
    pub url: String,
    /// Namespace of the SOAP operation elements.
    pub namespace: String,
    /// Service layout version.
    pub version: String,
}

impl MunicipalityEndpoints {
    /// Select the URL and namespace for `environment`.
    pub fn resolve(&self, environment: Environment) -> ResolvedEndpoint {
        let (url, namespace) = match environment {
            Environment::Production => (&self.production_url, &self.production_namespace),
            Environment::Homologation => (&self.homologation_url, &self.homologation_namespace),
        };
        ResolvedEndpoint {
            url: url.clone(),
            namespace: namespace.clone(),
            version: self.version.clone(),
        }
    }
}

/// Endpoint records keyed by IBGE municipal code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointCatalog {
    municipalities: BTreeMap<String, MunicipalityEndpoints>,
}

impl EndpointCatalog {
    /// The catalog bundled with this crate.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_json_str(BUILTIN_CATALOG)
    }

    /// Parse a catalog from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load a catalog from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Look up a municipality by IBGE code.
    pub fn get(&self, municipal_code: &str) -> Option<&MunicipalityEndpoints> {
        self.municipalities.get(municipal_code)
    }

    /// Number of municipalities in the catalog.
    pub fn len(&self) -> usize {
        self.municipalities.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.municipalities.is_empty()
    }

    /// Resolve the endpoint for a municipality and environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownMunicipality`] if the code is absent.
    pub fn resolve(
        &self,
        municipal_code: &str,
        environment: Environment,
    ) -> Result<ResolvedEndpoint, ConfigError> {
        self.get(municipal_code)
            .map(|m| m.resolve(environment))
            .ok_or_else(|| ConfigError::UnknownMunicipality(municipal_code.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_has_sao_jose_dos_pinhais() {
        let catalog = EndpointCatalog::builtin().expect("builtin catalog parses");
        assert_eq!(catalog.len(), 1);
        let sjp = catalog.get("4125506").expect("SJP present");
        assert_eq!(sjp.state, "PR");
        assert_eq!(sjp.version, "3");
    }

    #[test]
    fn resolve_selects_by_environment() {
        let catalog = EndpointCatalog::builtin().expect("builtin catalog parses");

        let homolog = catalog
            .resolve("4125506", Environment::Homologation)
            .expect("resolve");
        assert!(homolog.url.contains("/homologacao/"));
        assert!(homolog.namespace.contains("/homologacao/"));

        let prod = catalog
            .resolve("4125506", Environment::Production)
            .expect("resolve");
        assert!(!prod.url.contains("homologacao"));
        assert!(!prod.namespace.contains("homologacao"));
    }

    #[test]
    fn unknown_municipality_rejected() {
        let catalog = EndpointCatalog::builtin().expect("builtin catalog parses");
        assert!(matches!(
            catalog.resolve("0000000", Environment::Production),
            Err(ConfigError::UnknownMunicipality(code)) if code == "0000000"
        ));
    }

    #[test]
    fn malformed_catalog_rejected() {
        assert!(matches!(
            EndpointCatalog::from_json_str(r#"{"1": {"municipio": "X"}}"#),
            Err(ConfigError::Parse(_))
        ));
    }
}

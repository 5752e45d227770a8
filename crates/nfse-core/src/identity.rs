//! # Provider Identity
//!
//! The taxpayer on whose behalf every request is issued (the *Prestador*).
//! A `ProviderIdentity` is constructed once at startup and never mutated.
//!
//! ## Validation
//!
//! - Tax id (CNPJ): exactly 14 ASCII digits.
//! - Municipal registration: 1 to 15 characters after trimming.
//! - Municipal code (IBGE): exactly 7 ASCII digits.
//! - Legal name: non-empty after trimming.
//!
//! Every rule runs in [`ProviderIdentity::new`], so an identity that exists
//! is an identity every builder can use.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ProviderConfig;
use crate::error::ConfigError;

/// Maximum length of a municipal registration (`tsInscricaoMunicipal`).
const MAX_MUNICIPAL_REGISTRATION_LEN: usize = 15;

/// Authority environment a request targets.
///
/// Configuration encodes it as `1` (production) or `2` (homologation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Environment {
    /// Live environment; submissions have fiscal effect.
    Production,
    /// Test environment offered by the authority.
    Homologation,
}

impl Environment {
    /// Numeric code used in configuration files.
    pub fn code(self) -> u8 {
        match self {
            Self::Production => 1,
            Self::Homologation => 2,
        }
    }
}

impl TryFrom<u8> for Environment {
    type Error = ConfigError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Production),
            2 => Ok(Self::Homologation),
            other => Err(ConfigError::UnknownEnvironment(other)),
        }
    }
}

impl From<Environment> for u8 {
    fn from(env: Environment) -> Self {
        env.code()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Homologation => write!(f, "homologation"),
        }
    }
}

/// Immutable identity of the service provider issuing requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderIdentity {
    tax_id: String,
    municipal_registration: String,
    municipal_code: String,
    legal_name: String,
    environment: Environment,
}

impl ProviderIdentity {
    /// Create a provider identity, validating every field.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] for blank fields and
    /// [`ConfigError::InvalidField`] for malformed ones.
    pub fn new(
        tax_id: impl Into<String>,
        municipal_registration: impl Into<String>,
        municipal_code: impl Into<String>,
        legal_name: impl Into<String>,
        environment: Environment,
    ) -> Result<Self, ConfigError> {
        let tax_id = required("taxId", tax_id.into())?;
        let municipal_registration =
            required("municipalRegistration", municipal_registration.into())?;
        let municipal_code = required("municipalCode", municipal_code.into())?;
        let legal_name = required("legalName", legal_name.into())?;

        require_digits("taxId", &tax_id, 14)?;
        require_digits("municipalCode", &municipal_code, 7)?;
        if municipal_registration.chars().count() > MAX_MUNICIPAL_REGISTRATION_LEN {
            return Err(ConfigError::InvalidField {
                field: "municipalRegistration",
                reason: format!(
                    "at most {MAX_MUNICIPAL_REGISTRATION_LEN} characters, got {}",
                    municipal_registration.chars().count()
                ),
            });
        }

        Ok(Self {
            tax_id,
            municipal_registration,
            municipal_code,
            legal_name,
            environment,
        })
    }

    /// Build an identity from a deserialized configuration record.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ConfigError> {
        let code = config
            .environment
            .ok_or(ConfigError::MissingField("environment"))?;
        let environment = Environment::try_from(code)?;
        Self::new(
            config.tax_id.as_deref().unwrap_or_default(),
            config.municipal_registration.as_deref().unwrap_or_default(),
            config.municipal_code.as_deref().unwrap_or_default(),
            config.legal_name.as_deref().unwrap_or_default(),
            environment,
        )
    }

    /// The provider's CNPJ (14 digits).
    pub fn tax_id(&self) -> &str {
        &self.tax_id
    }

    /// The provider's municipal registration (*Inscrição Municipal*).
    pub fn municipal_registration(&self) -> &str {
        &self.municipal_registration
    }

    /// IBGE code of the municipality the provider is registered in.
    pub fn municipal_code(&self) -> &str {
        &self.municipal_code
    }

    /// Registered legal name (*Razão Social*).
    pub fn legal_name(&self) -> &str {
        &self.legal_name
    }

    /// Environment every request from this identity targets.
    pub fn environment(&self) -> Environment {
        self.environment
    }
}

fn required(field: &'static str, value: String) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

fn require_digits(field: &'static str, value: &str, len: usize) -> Result<(), ConfigError> {
    if value.len() != len || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ConfigError::InvalidField {
            field,
            reason: format!("expected exactly {len} digits, got {value:?}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn identity() -> Result<ProviderIdentity, ConfigError> {
        ProviderIdentity::new(
            "99999999000191",
            "1733160024",
            "4125506",
            "Empresa Test Ltda",
            Environment::Homologation,
        )
    }

    #[test]
    fn valid_identity_exposes_fields() {
        let id = identity().expect("valid identity");
        assert_eq!(id.tax_id(), "99999999000191");
        assert_eq!(id.municipal_registration(), "1733160024");
        assert_eq!(id.municipal_code(), "4125506");
        assert_eq!(id.legal_name(), "Empresa Test Ltda");
        assert_eq!(id.environment(), Environment::Homologation);
    }

    #[test]
    fn fields_are_trimmed() {
        let id = ProviderIdentity::new(
            " 99999999000191 ",
            " 1733160024",
            "4125506 ",
            "  Empresa  ",
            Environment::Production,
        )
        .expect("valid identity");
        assert_eq!(id.tax_id(), "99999999000191");
        assert_eq!(id.legal_name(), "Empresa");
    }

    #[test]
    fn blank_fields_fail_fast() {
        let err = ProviderIdentity::new("", "1", "4125506", "X", Environment::Production)
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingField("taxId")));

        let err = ProviderIdentity::new("99999999000191", "  ", "4125506", "X", Environment::Production)
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingField("municipalRegistration")));

        let err = ProviderIdentity::new("99999999000191", "1", "", "X", Environment::Production)
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingField("municipalCode")));

        let err = ProviderIdentity::new("99999999000191", "1", "4125506", "\t", Environment::Production)
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingField("legalName")));
    }

    #[test]
    fn malformed_tax_id_rejected() {
        let err = ProviderIdentity::new("99.999.999/0001-91", "1", "4125506", "X", Environment::Production)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { field: "taxId", .. }));
    }

    #[test]
    fn malformed_municipal_code_rejected() {
        let err = ProviderIdentity::new("99999999000191", "1", "412550", "X", Environment::Production)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { field: "municipalCode", .. }));
    }

    #[test]
    fn overlong_municipal_registration_rejected() {
        let err = ProviderIdentity::new(
            "99999999000191",
            "1234567890123456",
            "4125506",
            "X",
            Environment::Production,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { field: "municipalRegistration", .. }));
    }

    #[test]
    fn environment_codes() {
        assert_eq!(Environment::try_from(1).unwrap(), Environment::Production);
        assert_eq!(Environment::try_from(2).unwrap(), Environment::Homologation);
        assert!(matches!(
            Environment::try_from(3),
            Err(ConfigError::UnknownEnvironment(3))
        ));
        assert_eq!(Environment::Production.code(), 1);
        assert_eq!(Environment::Homologation.to_string(), "homologation");
    }

    #[test]
    fn environment_serde_uses_numeric_code() {
        let json = serde_json::to_string(&Environment::Homologation).unwrap();
        assert_eq!(json, "2");
        let env: Environment = serde_json::from_str("1").unwrap();
        assert_eq!(env, Environment::Production);
        assert!(serde_json::from_str::<Environment>("7").is_err());
    }

    proptest! {
        #[test]
        fn tax_id_accepted_iff_fourteen_digits(tax_id in "[0-9a-z]{10,16}") {
            let result = ProviderIdentity::new(
                tax_id.clone(),
                "1",
                "4125506",
                "X",
                Environment::Production,
            );
            let valid = tax_id.len() == 14 && tax_id.bytes().all(|b| b.is_ascii_digit());
            prop_assert_eq!(result.is_ok(), valid);
        }
    }
}

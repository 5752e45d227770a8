//! # Query Parameters
//!
//! Parameter types for the invoice queries and the cancellation request.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Optional taker (*Tomador*) filter for period queries.
///
/// At most one taker identity is active: when both `cnpj` and `cpf` are
/// set, `cnpj` wins. `municipal_registration` only takes effect alongside
/// a taker identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TakerFilter {
    /// Taker CNPJ (legal entity).
    pub cnpj: Option<String>,
    /// Taker CPF (individual).
    pub cpf: Option<String>,
    /// Taker municipal registration.
    pub municipal_registration: Option<String>,
}

/// The taker identity a filter resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakerId<'a> {
    /// Filter by CNPJ.
    Cnpj(&'a str),
    /// Filter by CPF.
    Cpf(&'a str),
}

impl TakerFilter {
    /// Filter by taker CNPJ.
    pub fn by_cnpj(cnpj: impl Into<String>) -> Self {
        Self {
            cnpj: Some(cnpj.into()),
            ..Self::default()
        }
    }

    /// Filter by taker CPF.
    pub fn by_cpf(cpf: impl Into<String>) -> Self {
        Self {
            cpf: Some(cpf.into()),
            ..Self::default()
        }
    }

    /// Also filter by the taker's municipal registration.
    pub fn with_municipal_registration(mut self, registration: impl Into<String>) -> Self {
        self.municipal_registration = Some(registration.into());
        self
    }

    /// The active taker identity, applying CNPJ precedence.
    pub fn taker_id(&self) -> Option<TakerId<'_>> {
        match (self.cnpj.as_deref(), self.cpf.as_deref()) {
            (Some(cnpj), _) => Some(TakerId::Cnpj(cnpj)),
            (None, Some(cpf)) => Some(TakerId::Cpf(cpf)),
            (None, None) => None,
        }
    }

    /// Municipal registration to emit; `None` unless a taker identity is active.
    pub fn effective_municipal_registration(&self) -> Option<&str> {
        self.taker_id()?;
        self.municipal_registration.as_deref()
    }
}

/// Identification of one RPS: number, series and type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpsIdentification {
    /// RPS number.
    pub number: String,
    /// RPS series.
    pub series: String,
    /// RPS type code (1 = RPS, 2 = mixed note, 3 = coupon).
    pub rps_type: u8,
}

impl RpsIdentification {
    /// Create an RPS identification.
    pub fn new(number: impl Into<String>, series: impl Into<String>, rps_type: u8) -> Self {
        Self {
            number: number.into(),
            series: series.into(),
            rps_type,
        }
    }
}

/// Reason code of a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CancellationCode {
    /// The invoice was issued in error.
    IssuanceError,
    /// The service was not concluded.
    ServiceNotConcluded,
}

impl CancellationCode {
    /// Numeric code sent to the authority.
    pub fn code(self) -> u8 {
        match self {
            Self::IssuanceError => 1,
            Self::ServiceNotConcluded => 2,
        }
    }
}

impl fmt::Display for CancellationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

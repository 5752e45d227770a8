//! # Error Types — Structured Error Hierarchy
//!
//! Defines the error types used throughout the NFSe client. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - `LimitExceeded`, `ValidationFailed` and `UnsupportedOperation` are
//!   raised locally and never reach the network.
//! - `SigningFailed` and `TransportFailure` wrap collaborator errors verbatim.
//!   Nothing in this workspace retries them: the authority correlates lots by
//!   caller-assigned numbers, so a resubmission is a business decision.

use thiserror::Error;

use crate::operation::Operation;

/// Top-level error type for a pipeline invocation.
#[derive(Error, Debug)]
pub enum NfseError {
    /// The lot carries more RPS than the authority accepts in one submission.
    #[error("lot holds {count} RPS; the limit is {max} per lot")]
    LimitExceeded {
        /// Number of RPS items in the rejected lot.
        count: usize,
        /// Maximum number of RPS items per lot.
        max: usize,
    },

    /// The finished payload does not conform to its schema. Nothing was sent.
    #[error("payload failed validation against '{schema}':\n{violations}")]
    ValidationFailed {
        /// Schema file the payload was validated against.
        schema: String,
        /// Rendered list of violations reported by the validator.
        violations: String,
    },

    /// The signing collaborator rejected the request.
    #[error("signing failed: {0}")]
    SigningFailed(#[from] SigningError),

    /// The transport collaborator failed or the authority returned a fault.
    #[error("transport failure: {0}")]
    TransportFailure(#[from] TransportError),

    /// The operation is not enabled for the active authority profile.
    #[error("{operation} is not enabled for the '{authority}' profile")]
    UnsupportedOperation {
        /// The operation that was invoked.
        operation: Operation,
        /// Name of the authority profile that disables it.
        authority: String,
    },

    /// The request document could not be constructed.
    #[error("request construction failed: {0}")]
    Build(#[from] BuildError),

    /// Configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Error while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required field is absent or blank.
    #[error("required field '{0}' is missing or empty")]
    MissingField(&'static str),

    /// A field is present but malformed.
    #[error("field '{field}' is malformed: {reason}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The environment code is neither 1 (production) nor 2 (homologation).
    #[error("unknown environment code {0}; expected 1 (production) or 2 (homologation)")]
    UnknownEnvironment(u8),

    /// No endpoint record exists for the municipality.
    #[error("no endpoint registered for municipality {0}")]
    UnknownMunicipality(String),

    /// The configuration document could not be parsed.
    #[error("cannot parse configuration: {0}")]
    Parse(String),

    /// IO error reading a configuration file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error while constructing an unsigned request document.
#[derive(Error, Debug)]
pub enum BuildError {
    /// The XML writer failed or a namespace prefix was used out of scope.
    #[error("xml error: {0}")]
    Xml(String),

    /// An RPS item could not render its fragment.
    #[error("RPS #{index} failed to render: {reason}")]
    RpsRender {
        /// Zero-based position of the item in the lot.
        index: usize,
        /// Message reported by the item.
        reason: String,
    },

    /// An RPS item rendered a fragment that is not well-formed XML.
    #[error("RPS #{index} rendered malformed XML: {reason}")]
    MalformedFragment {
        /// Zero-based position of the item in the lot.
        index: usize,
        /// Parser diagnostic.
        reason: String,
    },
}

/// Error reported by a signature applier.
#[derive(Error, Debug)]
pub enum SigningError {
    /// The element to sign (or its wrapper) is absent from the document.
    #[error("element '{0}' not found in document")]
    ElementNotFound(String),

    /// The document could not be parsed for signing.
    #[error("cannot parse document for signing: {0}")]
    MalformedDocument(String),

    /// The certificate or private key could not be used.
    #[error("certificate error: {0}")]
    Certificate(String),
}

/// Error reported by a transport client.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The endpoint could not be reached.
    #[error("{operation}: service unreachable: {reason}")]
    Unreachable {
        /// Wire operation that was being called.
        operation: String,
        /// Human-readable description of the failure.
        reason: String,
    },

    /// The authority answered with a SOAP fault or non-2xx status.
    #[error("{operation}: authority returned HTTP {status}: {body}")]
    Fault {
        /// Wire operation that was being called.
        operation: String,
        /// HTTP status code.
        status: u16,
        /// Raw response body, uninterpreted.
        body: String,
    },

    /// The request did not complete within the configured timeout.
    #[error("{operation}: request timed out after {elapsed_ms}ms")]
    Timeout {
        /// Wire operation that was being called.
        operation: String,
        /// Timeout that triggered, in milliseconds.
        elapsed_ms: u64,
    },

    /// The transport is not usable in the current context.
    #[error("transport not configured: {0}")]
    NotConfigured(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_exceeded_message_names_count_and_limit() {
        let err = NfseError::LimitExceeded { count: 51, max: 50 };
        let msg = err.to_string();
        assert!(msg.contains("51"));
        assert!(msg.contains("50"));
    }

    #[test]
    fn unsupported_operation_message_names_profile() {
        let err = NfseError::UnsupportedOperation {
            operation: Operation::CancelInvoice,
            authority: "São José dos Pinhais".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "CancelInvoice is not enabled for the 'São José dos Pinhais' profile"
        );
    }

    #[test]
    fn collaborator_errors_convert_verbatim() {
        let err: NfseError = SigningError::Certificate("expired".into()).into();
        assert!(matches!(err, NfseError::SigningFailed(_)));
        assert!(err.to_string().contains("expired"));

        let err: NfseError = TransportError::Fault {
            operation: "ConsultarNfseV3".into(),
            status: 500,
            body: "<faultstring>boom</faultstring>".into(),
        }
        .into();
        assert!(matches!(err, NfseError::TransportFailure(_)));
        assert!(err.to_string().contains("<faultstring>boom</faultstring>"));
    }
}

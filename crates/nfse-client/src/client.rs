//! # Request Orchestrator
//!
//! [`NfseClient`] exposes one method per web-service operation. Every
//! method runs the same linear pipeline:
//!
//! ```text
//! profile gate → build → sign (per stage) → normalize → validate → transmit
//! ```
//!
//! A failure at any step ends the call. The transport is unreachable unless
//! validation returned `Ok`. The client holds no mutable state; one
//! instance can serve concurrent callers.

use std::sync::Arc;

use nfse_core::{
    AuthorityProfile, CancellationCode, ConfigError, LotEnvelope, NfseConfig, NfseError, Operation,
    ProviderIdentity, RpsIdentification, RpsItem, TakerFilter,
};
use nfse_schema::{SchemaSet, SchemaValidationError, SchemaValidator, StructuralValidator};
use nfse_xml::strip_xml_declarations;

use crate::builders;
use crate::signing::{apply_stages, SignatureApplier};
use crate::transport::Transport;

/// Client for the municipal NFSe web service.
pub struct NfseClient {
    identity: ProviderIdentity,
    profile: AuthorityProfile,
    schemas: SchemaSet,
    signer: Arc<dyn SignatureApplier>,
    validator: Arc<dyn SchemaValidator>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for NfseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NfseClient")
            .field("identity", &self.identity)
            .field("profile", &self.profile)
            .field("schemas", &self.schemas)
            .finish_non_exhaustive()
    }
}

/// Builder for [`NfseClient`].
///
/// The signer, transport and schema set are required. The profile defaults
/// to [`AuthorityProfile::sao_jose_dos_pinhais`] and the validator to
/// [`StructuralValidator`].
pub struct NfseClientBuilder {
    identity: ProviderIdentity,
    profile: Option<AuthorityProfile>,
    schemas: Option<SchemaSet>,
    signer: Option<Arc<dyn SignatureApplier>>,
    validator: Option<Arc<dyn SchemaValidator>>,
    transport: Option<Arc<dyn Transport>>,
}

impl NfseClientBuilder {
    pub fn profile(mut self, profile: AuthorityProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn schemas(mut self, schemas: SchemaSet) -> Self {
        self.schemas = Some(schemas);
        self
    }

    pub fn signer(mut self, signer: Arc<dyn SignatureApplier>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn validator(mut self, validator: Arc<dyn SchemaValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Finish the client.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingField`] naming the first absent collaborator.
    /// A schema directory lacking files for enabled operations is logged
    /// here; the affected calls fail validation at call time.
    pub fn build(self) -> Result<NfseClient, NfseError> {
        let profile = self
            .profile
            .unwrap_or_else(AuthorityProfile::sao_jose_dos_pinhais);
        let schemas = self.schemas.ok_or(ConfigError::MissingField("schemaDir"))?;

        let enabled: Vec<Operation> = Operation::ALL
            .into_iter()
            .filter(|op| profile.is_enabled(*op))
            .collect();
        for path in schemas.missing_files(&enabled) {
            tracing::warn!(schema = %path.display(), "schema file missing");
        }

        Ok(NfseClient {
            identity: self.identity,
            profile,
            schemas,
            signer: self.signer.ok_or(ConfigError::MissingField("signer"))?,
            validator: self
                .validator
                .unwrap_or_else(|| Arc::new(StructuralValidator::new())),
            transport: self.transport.ok_or(ConfigError::MissingField("transport"))?,
        })
    }
}

impl NfseClient {
    /// Start building a client for `identity`.
    pub fn builder(identity: ProviderIdentity) -> NfseClientBuilder {
        NfseClientBuilder {
            identity,
            profile: None,
            schemas: None,
            signer: None,
            validator: None,
            transport: None,
        }
    }

    /// Build a client from deployment configuration with the default
    /// profile and validator.
    pub fn from_config(
        config: &NfseConfig,
        signer: Arc<dyn SignatureApplier>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, NfseError> {
        Self::builder(config.identity()?)
            .schemas(SchemaSet::new(config.schema_dir.clone()))
            .signer(signer)
            .transport(transport)
            .build()
    }

    pub fn identity(&self) -> &ProviderIdentity {
        &self.identity
    }

    pub fn profile(&self) -> &AuthorityProfile {
        &self.profile
    }

    /// Submit a lot of up to 50 RPS (`RecepcionarLoteRpsV3`).
    pub fn submit_lot<R: RpsItem>(&self, lot: &LotEnvelope<R>) -> Result<String, NfseError> {
        self.run(Operation::SubmitLot, |identity| {
            builders::build_lot_submission(identity, lot)
        })
    }

    /// Processing status of a submitted lot (`ConsultarSituacaoLoteRpsV3`).
    pub fn query_lot_status(&self, protocol: &str) -> Result<String, NfseError> {
        self.run(Operation::QueryLotStatus, |identity| {
            builders::build_lot_status_query(identity, protocol)
        })
    }

    /// Result of a processed lot (`ConsultarLoteRpsV3`).
    pub fn retrieve_lot(&self, protocol: &str) -> Result<String, NfseError> {
        self.run(Operation::RetrieveLot, |identity| {
            builders::build_lot_retrieval(identity, protocol)
        })
    }

    /// Invoices issued between two `YYYY-MM-DD` dates (`ConsultarNfseV3`).
    pub fn query_invoices_by_period(
        &self,
        start_date: &str,
        end_date: &str,
        taker: Option<&TakerFilter>,
    ) -> Result<String, NfseError> {
        self.run(Operation::QueryInvoicesByPeriod, |identity| {
            builders::build_period_query(identity, start_date, end_date, taker)
        })
    }

    /// Invoice generated from an RPS (`ConsultarNfsePorRpsV3`).
    pub fn query_invoice_by_rps(&self, rps: &RpsIdentification) -> Result<String, NfseError> {
        self.run(Operation::QueryInvoiceByRps, |identity| {
            builders::build_rps_query(identity, rps)
        })
    }

    /// Cancel an issued invoice (`CancelarNfseV3`).
    ///
    /// Fails with [`NfseError::UnsupportedOperation`] unless the active
    /// profile enables cancellation.
    pub fn cancel_invoice(
        &self,
        nfse_number: &str,
        code: CancellationCode,
        id: Option<&str>,
    ) -> Result<String, NfseError> {
        self.run(Operation::CancelInvoice, |identity| {
            builders::build_cancellation(identity, nfse_number, code, id)
        })
    }

    fn run<F>(&self, operation: Operation, build: F) -> Result<String, NfseError>
    where
        F: FnOnce(&ProviderIdentity) -> Result<String, NfseError>,
    {
        let descriptor = operation.descriptor();

        if let Err(e) = self.profile.ensure_enabled(operation) {
            tracing::warn!(operation = %operation, profile = %self.profile.name(), "operation disabled for profile");
            return Err(e);
        }

        let unsigned = build(&self.identity).map_err(|e| {
            tracing::warn!(operation = %operation, error = %e, "request construction rejected");
            e
        })?;
        tracing::debug!(operation = %operation, bytes = unsigned.len(), "request built");

        let signed = apply_stages(self.signer.as_ref(), &unsigned, descriptor.stages).map_err(|e| {
            tracing::warn!(operation = %operation, error = %e, "signing failed");
            NfseError::from(e)
        })?;
        let payload = strip_xml_declarations(&signed).into_owned();
        tracing::debug!(operation = %operation, stages = descriptor.stages.len(), "request signed");

        let schema_path = self.schemas.path_for(operation);
        self.validator
            .validate(&payload, &schema_path)
            .map_err(|e| {
                tracing::warn!(operation = %operation, schema = %e.schema_name(), "payload failed validation");
                validation_failed(e)
            })?;
        tracing::debug!(operation = %operation, schema = descriptor.schema_file, "payload validated");

        let response = self.transport.send(&payload, operation).map_err(|e| {
            tracing::warn!(operation = %operation, error = %e, "transport failure");
            NfseError::from(e)
        })?;
        tracing::info!(operation = %operation, wire_name = descriptor.wire_name, "request transmitted");
        Ok(response)
    }
}

fn validation_failed(err: SchemaValidationError) -> NfseError {
    match err {
        SchemaValidationError::ValidationFailed {
            schema_name,
            violations,
        } => NfseError::ValidationFailed {
            schema: schema_name,
            violations: violations.to_string(),
        },
        SchemaValidationError::SchemaLoadError { schema_name, reason } => NfseError::ValidationFailed {
            schema: schema_name,
            violations: format!("  (schema): {reason}"),
        },
    }
}

//! # Operations, Descriptors and Authority Profiles
//!
//! One [`Operation`] variant per web-service method the authority exposes,
//! and one static [`OperationDescriptor`] per variant. The descriptor is the
//! single place that knows the wire name, the root element, the namespace,
//! the schema file, and how the document is signed.
//!
//! ## Signature Stages
//!
//! Most requests are signed once, at the root. Lot submission signs the
//! inner `LoteRps` (referenced by its `Id`) and places the signature in the
//! enclosing envelope. Cancellation signs twice: `InfPedidoCancelamento`
//! into `Pedido`, then `Pedido` into `CancelarNfseEnvio`.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::NfseError;

/// Namespace of the shared type definitions (`tipos_v03.xsd`).
pub const TYPES_NAMESPACE: &str = "http://nfe.sjp.pr.gov.br/tipos_v03.xsd";

/// XML-DSig namespace of enveloped `Signature` elements.
pub const DSIG_NAMESPACE: &str = "http://www.w3.org/2000/09/xmldsig#";

/// Web-service operations offered by the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Asynchronous submission of a lot of RPS.
    SubmitLot,
    /// Processing status of a submitted lot.
    QueryLotStatus,
    /// Result of a processed lot.
    RetrieveLot,
    /// Invoices issued in a period, optionally filtered by taker.
    QueryInvoicesByPeriod,
    /// Invoice generated from a given RPS.
    QueryInvoiceByRps,
    /// Cancellation of an issued invoice.
    CancelInvoice,
}

impl Operation {
    /// Every operation, in declaration order.
    pub const ALL: [Operation; 6] = [
        Operation::SubmitLot,
        Operation::QueryLotStatus,
        Operation::RetrieveLot,
        Operation::QueryInvoicesByPeriod,
        Operation::QueryInvoiceByRps,
        Operation::CancelInvoice,
    ];

    /// Static metadata for this operation.
    pub fn descriptor(self) -> &'static OperationDescriptor {
        match self {
            Self::SubmitLot => &SUBMIT_LOT,
            Self::QueryLotStatus => &QUERY_LOT_STATUS,
            Self::RetrieveLot => &RETRIEVE_LOT,
            Self::QueryInvoicesByPeriod => &QUERY_INVOICES_BY_PERIOD,
            Self::QueryInvoiceByRps => &QUERY_INVOICE_BY_RPS,
            Self::CancelInvoice => &CANCEL_INVOICE,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubmitLot => write!(f, "SubmitLot"),
            Self::QueryLotStatus => write!(f, "QueryLotStatus"),
            Self::RetrieveLot => write!(f, "RetrieveLot"),
            Self::QueryInvoicesByPeriod => write!(f, "QueryInvoicesByPeriod"),
            Self::QueryInvoiceByRps => write!(f, "QueryInvoiceByRps"),
            Self::CancelInvoice => write!(f, "CancelInvoice"),
        }
    }
}

/// Digest algorithm requested from the signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// SHA-1, as required by the v03 schemas.
    Sha1,
    /// SHA-256.
    Sha256,
}

impl DigestAlgorithm {
    /// XML-DSig algorithm identifier for the digest method.
    pub fn digest_uri(self) -> &'static str {
        match self {
            Self::Sha1 => "http://www.w3.org/2000/09/xmldsig#sha1",
            Self::Sha256 => "http://www.w3.org/2001/04/xmlenc#sha256",
        }
    }
}

/// Canonicalization options passed to the signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Canonicalization {
    /// Exclusive (`true`) or inclusive (`false`) C14N.
    pub exclusive: bool,
    /// Whether comments take part in the digest.
    pub with_comments: bool,
}

impl Canonicalization {
    /// Inclusive C14N 1.0 without comments.
    pub const INCLUSIVE: Canonicalization = Canonicalization {
        exclusive: false,
        with_comments: false,
    };

    /// XML-DSig algorithm identifier for this canonicalization.
    pub fn algorithm_uri(self) -> &'static str {
        match (self.exclusive, self.with_comments) {
            (false, false) => "http://www.w3.org/TR/2001/REC-xml-c14n-20010315",
            (false, true) => "http://www.w3.org/TR/2001/REC-xml-c14n-20010315#WithComments",
            (true, false) => "http://www.w3.org/2001/10/xml-exc-c14n#",
            (true, true) => "http://www.w3.org/2001/10/xml-exc-c14n#WithComments",
        }
    }
}

/// One application of an enveloped signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignatureStage {
    /// Local name of the element whose content is signed.
    pub signed_element: &'static str,
    /// Attribute carrying the reference id, if the element has one.
    pub id_attribute: Option<&'static str>,
    /// Local name of the element that receives the `Signature` as its last
    /// child. `None` places it inside the signed element itself.
    pub wrapper: Option<&'static str>,
    /// Digest algorithm.
    pub digest: DigestAlgorithm,
    /// Canonicalization options.
    pub canonicalization: Canonicalization,
}

impl SignatureStage {
    /// Local name of the element that receives the signature.
    pub fn placement(&self) -> &'static str {
        self.wrapper.unwrap_or(self.signed_element)
    }
}

const fn stage(
    signed_element: &'static str,
    id_attribute: Option<&'static str>,
    wrapper: Option<&'static str>,
) -> SignatureStage {
    SignatureStage {
        signed_element,
        id_attribute,
        wrapper,
        digest: DigestAlgorithm::Sha1,
        canonicalization: Canonicalization::INCLUSIVE,
    }
}

/// Static per-operation metadata.
#[derive(Debug, PartialEq, Eq)]
pub struct OperationDescriptor {
    /// The operation this descriptor belongs to.
    pub operation: Operation,
    /// SOAP operation name.
    pub wire_name: &'static str,
    /// Local name of the request's root element.
    pub root_element: &'static str,
    /// Namespace of the request's root element.
    pub namespace: &'static str,
    /// XSD file the finished request is validated against.
    pub schema_file: &'static str,
    /// Signature applications, in order.
    pub stages: &'static [SignatureStage],
}

impl OperationDescriptor {
    /// Local name of the element signed by the first stage.
    pub fn signed_element(&self) -> &'static str {
        self.stages
            .first()
            .map(|s| s.signed_element)
            .unwrap_or(self.root_element)
    }

    /// Id attribute of the element signed by the first stage.
    pub fn id_attribute(&self) -> Option<&'static str> {
        self.stages.first().and_then(|s| s.id_attribute)
    }
}

static SUBMIT_LOT: OperationDescriptor = OperationDescriptor {
    operation: Operation::SubmitLot,
    wire_name: "RecepcionarLoteRpsV3",
    root_element: "EnviarLoteRpsEnvio",
    namespace: "http://nfe.sjp.pr.gov.br/servico_enviar_lote_rps_envio_v03.xsd",
    schema_file: "servico_enviar_lote_rps_envio_v03.xsd",
    stages: &[stage("LoteRps", Some("Id"), Some("EnviarLoteRpsEnvio"))],
};

static QUERY_LOT_STATUS: OperationDescriptor = OperationDescriptor {
    operation: Operation::QueryLotStatus,
    wire_name: "ConsultarSituacaoLoteRpsV3",
    root_element: "ConsultarSituacaoLoteRpsEnvio",
    namespace: "http://nfe.sjp.pr.gov.br/servico_consultar_situacao_lote_rps_envio_v03.xsd",
    schema_file: "servico_consultar_situacao_lote_rps_envio_v03.xsd",
    stages: &[stage("ConsultarSituacaoLoteRpsEnvio", None, None)],
};

static RETRIEVE_LOT: OperationDescriptor = OperationDescriptor {
    operation: Operation::RetrieveLot,
    wire_name: "ConsultarLoteRpsV3",
    root_element: "ConsultarLoteRpsEnvio",
    namespace: "http://nfe.sjp.pr.gov.br/servico_consultar_lote_rps_envio_v03.xsd",
    schema_file: "servico_consultar_lote_rps_envio_v03.xsd",
    stages: &[stage("ConsultarLoteRpsEnvio", None, None)],
};

static QUERY_INVOICES_BY_PERIOD: OperationDescriptor = OperationDescriptor {
    operation: Operation::QueryInvoicesByPeriod,
    wire_name: "ConsultarNfseV3",
    root_element: "ConsultarNfseEnvio",
    namespace: "http://nfe.sjp.pr.gov.br/servico_consultar_nfse_envio_v03.xsd",
    schema_file: "servico_consultar_nfse_envio_v03.xsd",
    stages: &[stage("ConsultarNfseEnvio", None, None)],
};

static QUERY_INVOICE_BY_RPS: OperationDescriptor = OperationDescriptor {
    operation: Operation::QueryInvoiceByRps,
    wire_name: "ConsultarNfsePorRpsV3",
    root_element: "ConsultarNfseRpsEnvio",
    namespace: "http://nfe.sjp.pr.gov.br/servico_consultar_nfse_rps_envio_v03.xsd",
    schema_file: "servico_consultar_nfse_rps_envio_v03.xsd",
    stages: &[stage("ConsultarNfseRpsEnvio", None, None)],
};

static CANCEL_INVOICE: OperationDescriptor = OperationDescriptor {
    operation: Operation::CancelInvoice,
    wire_name: "CancelarNfseV3",
    root_element: "CancelarNfseEnvio",
    namespace: "http://nfe.sjp.pr.gov.br/servico_cancelar_nfse_envio_v03.xsd",
    schema_file: "servico_cancelar_nfse_envio_v03.xsd",
    stages: &[
        stage("InfPedidoCancelamento", Some("Id"), Some("Pedido")),
        stage("Pedido", None, Some("CancelarNfseEnvio")),
    ],
};

/// The set of operations an authority accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityProfile {
    name: String,
    enabled: BTreeSet<Operation>,
}

impl AuthorityProfile {
    /// Create a profile enabling exactly the given operations.
    pub fn new(name: impl Into<String>, enabled: impl IntoIterator<Item = Operation>) -> Self {
        Self {
            name: name.into(),
            enabled: enabled.into_iter().collect(),
        }
    }

    /// São José dos Pinhais (PR). The municipality has not enabled the
    /// cancellation service; every other operation is available.
    pub fn sao_jose_dos_pinhais() -> Self {
        Self::new(
            "São José dos Pinhais",
            Operation::ALL
                .into_iter()
                .filter(|op| *op != Operation::CancelInvoice),
        )
    }

    /// Return a copy of this profile with `operation` enabled.
    pub fn with_operation_enabled(mut self, operation: Operation) -> Self {
        self.enabled.insert(operation);
        self
    }

    /// Human-readable profile name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the authority accepts `operation`.
    pub fn is_enabled(&self, operation: Operation) -> bool {
        self.enabled.contains(&operation)
    }

    /// Fail with [`NfseError::UnsupportedOperation`] unless `operation` is enabled.
    pub fn ensure_enabled(&self, operation: Operation) -> Result<(), NfseError> {
        if self.is_enabled(operation) {
            Ok(())
        } else {
            Err(NfseError::UnsupportedOperation {
                operation,
                authority: self.name.clone(),
            })
        }
    }
}

//! # Request Content Models
//!
//! Declarative content models for the six v03 request schemas. Each model
//! names, for every element, its namespace, whether it may be omitted, any
//! required attribute, and what it may contain.
//!
//! The models mirror the authority's XSDs for the documents this client
//! emits. They are deliberately closed: an element the model does not list
//! is a violation.

use nfse_core::{Operation, DSIG_NAMESPACE, TYPES_NAMESPACE};

/// Namespace of a modelled element, relative to the schema being checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ns {
    /// The schema's own service namespace.
    Service,
    /// The shared types namespace.
    Types,
    /// XML-DSig.
    DSig,
    /// No namespace.
    Unqualified,
}

/// Lexical constraint on simple text content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRule {
    /// ASCII digits, length within `min..=max`.
    Digits { min: usize, max: usize },
    /// Collapsed token, character length within `min..=max`.
    Token { min: usize, max: usize },
    /// `xsd:date` in `YYYY-MM-DD` form.
    Date,
    /// Decimal integer within `min..=max`.
    Integer { min: i64, max: i64 },
}

impl TextRule {
    /// Exactly fourteen digits.
    pub const CNPJ: Self = Self::Digits { min: 14, max: 14 };
    /// Exactly eleven digits.
    pub const CPF: Self = Self::Digits { min: 11, max: 11 };
    /// Exactly seven digits.
    pub const MUNICIPAL_CODE: Self = Self::Digits { min: 7, max: 7 };
    /// Municipal registration token.
    pub const REGISTRATION: Self = Self::Token { min: 1, max: 15 };
    /// Invoice, lot, or RPS number.
    pub const NUMBER: Self = Self::Digits { min: 1, max: 15 };

    /// Check `value`, returning a description of the first problem.
    pub fn check(&self, value: &str) -> Result<(), String> {
        match *self {
            Self::Digits { min, max } => {
                if !value.chars().all(|c| c.is_ascii_digit()) {
                    return Err(format!("'{value}' must contain only digits"));
                }
                check_len(value, min, max)
            }
            Self::Token { min, max } => {
                if value.trim() != value || value.contains(['\n', '\r', '\t']) {
                    return Err(format!("'{value}' is not a collapsed token"));
                }
                check_len(value, min, max)
            }
            Self::Date => chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(|_| ())
                .map_err(|e| format!("'{value}' is not a valid date: {e}")),
            Self::Integer { min, max } => {
                let n: i64 = value
                    .parse()
                    .map_err(|_| format!("'{value}' is not an integer"))?;
                if (min..=max).contains(&n) {
                    Ok(())
                } else {
                    Err(format!("{n} is outside {min}..={max}"))
                }
            }
        }
    }
}

fn check_len(value: &str, min: usize, max: usize) -> Result<(), String> {
    let len = value.chars().count();
    if len < min || len > max {
        Err(format!("length {len} is outside {min}..={max}"))
    } else {
        Ok(())
    }
}

/// What an element may contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Simple text, no child elements.
    Text(TextRule),
    /// Child elements in this order; optional rules may be skipped.
    Sequence(Vec<ElementRule>),
    /// Exactly one of the listed elements.
    Choice(Vec<ElementRule>),
    /// `min..=max` repetitions of one element.
    List {
        item: Box<ElementRule>,
        min: usize,
        max: usize,
    },
    /// Anything; the subtree is not inspected.
    Any,
}

/// Content model of one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRule {
    pub ns: Ns,
    pub name: &'static str,
    pub optional: bool,
    pub required_attribute: Option<&'static str>,
    pub content: Content,
}

impl ElementRule {
    pub fn new(ns: Ns, name: &'static str, content: Content) -> Self {
        Self {
            ns,
            name,
            optional: false,
            required_attribute: None,
            content,
        }
    }

    pub fn text(ns: Ns, name: &'static str, rule: TextRule) -> Self {
        Self::new(ns, name, Content::Text(rule))
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn requires_attribute(mut self, name: &'static str) -> Self {
        self.required_attribute = Some(name);
        self
    }

    /// An optional enveloped `ds:Signature`, opaque to the model.
    pub fn signature() -> Self {
        Self::new(Ns::DSig, "Signature", Content::Any).optional()
    }
}

/// A complete request schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaModel {
    /// Schema file name the model stands for.
    pub schema_file: &'static str,
    /// Service namespace [`Ns::Service`] resolves to.
    pub namespace: &'static str,
    pub root: ElementRule,
}

impl SchemaModel {
    /// The model for `operation`'s request document.
    pub fn for_operation(operation: Operation) -> Self {
        let descriptor = operation.descriptor();
        let root = match operation {
            Operation::SubmitLot => lot_submission(),
            Operation::QueryLotStatus => protocol_query("ConsultarSituacaoLoteRpsEnvio"),
            Operation::RetrieveLot => protocol_query("ConsultarLoteRpsEnvio"),
            Operation::QueryInvoicesByPeriod => period_query(),
            Operation::QueryInvoiceByRps => rps_query(),
            Operation::CancelInvoice => cancellation(),
        };
        Self {
            schema_file: descriptor.schema_file,
            namespace: descriptor.namespace,
            root,
        }
    }

    /// The model whose schema file is named `file_name`.
    pub fn for_schema_file(file_name: &str) -> Option<Self> {
        Operation::ALL
            .iter()
            .find(|op| op.descriptor().schema_file == file_name)
            .map(|op| Self::for_operation(*op))
    }

    /// Namespace URI `ns` stands for in this schema.
    pub fn resolve(&self, ns: Ns) -> Option<&'static str> {
        match ns {
            Ns::Service => Some(self.namespace),
            Ns::Types => Some(TYPES_NAMESPACE),
            Ns::DSig => Some(DSIG_NAMESPACE),
            Ns::Unqualified => None,
        }
    }
}

fn provider() -> ElementRule {
    ElementRule::new(
        Ns::Service,
        "Prestador",
        Content::Sequence(vec![
            ElementRule::text(Ns::Types, "Cnpj", TextRule::CNPJ),
            ElementRule::text(Ns::Types, "InscricaoMunicipal", TextRule::REGISTRATION).optional(),
        ]),
    )
}

fn lot_submission() -> ElementRule {
    let rps = ElementRule::new(Ns::Types, "Rps", Content::Any);
    let lot = ElementRule::new(
        Ns::Service,
        "LoteRps",
        Content::Sequence(vec![
            ElementRule::text(Ns::Types, "NumeroLote", TextRule::NUMBER),
            ElementRule::text(Ns::Types, "Cnpj", TextRule::CNPJ),
            ElementRule::text(Ns::Types, "InscricaoMunicipal", TextRule::REGISTRATION),
            ElementRule::text(Ns::Types, "QuantidadeRps", TextRule::Integer { min: 1, max: 50 }),
            ElementRule::new(
                Ns::Types,
                "ListaRps",
                Content::List {
                    item: Box::new(rps),
                    min: 1,
                    max: nfse_core::MAX_RPS_PER_LOT,
                },
            ),
        ]),
    )
    .requires_attribute("Id");
    ElementRule::new(
        Ns::Service,
        "EnviarLoteRpsEnvio",
        Content::Sequence(vec![lot, ElementRule::signature()]),
    )
}

fn protocol_query(root: &'static str) -> ElementRule {
    ElementRule::new(
        Ns::Service,
        root,
        Content::Sequence(vec![
            provider(),
            ElementRule::text(Ns::Service, "Protocolo", TextRule::Token { min: 1, max: 50 }),
            ElementRule::signature(),
        ]),
    )
}

fn period_query() -> ElementRule {
    let period = ElementRule::new(
        Ns::Service,
        "PeriodoEmissao",
        Content::Sequence(vec![
            ElementRule::text(Ns::Service, "DataInicial", TextRule::Date),
            ElementRule::text(Ns::Service, "DataFinal", TextRule::Date),
        ]),
    )
    .optional();
    let taker = ElementRule::new(
        Ns::Service,
        "Tomador",
        Content::Sequence(vec![
            ElementRule::new(
                Ns::Service,
                "CpfCnpj",
                Content::Choice(vec![
                    ElementRule::text(Ns::Service, "Cnpj", TextRule::CNPJ),
                    ElementRule::text(Ns::Service, "Cpf", TextRule::CPF),
                ]),
            ),
            ElementRule::text(Ns::Service, "InscricaoMunicipal", TextRule::REGISTRATION).optional(),
        ]),
    )
    .optional();
    ElementRule::new(
        Ns::Service,
        "ConsultarNfseEnvio",
        Content::Sequence(vec![provider(), period, taker, ElementRule::signature()]),
    )
}

fn rps_query() -> ElementRule {
    let identification = ElementRule::new(
        Ns::Service,
        "IdentificacaoRps",
        Content::Sequence(vec![
            ElementRule::text(Ns::Types, "Numero", TextRule::NUMBER),
            ElementRule::text(Ns::Types, "Serie", TextRule::Token { min: 1, max: 5 }),
            ElementRule::text(Ns::Types, "Tipo", TextRule::Integer { min: 1, max: 3 }),
        ]),
    );
    ElementRule::new(
        Ns::Service,
        "ConsultarNfseRpsEnvio",
        Content::Sequence(vec![identification, provider(), ElementRule::signature()]),
    )
}

fn cancellation() -> ElementRule {
    let invoice = ElementRule::new(
        Ns::Types,
        "IdentificacaoNfse",
        Content::Sequence(vec![
            ElementRule::text(Ns::Types, "Numero", TextRule::NUMBER),
            ElementRule::text(Ns::Types, "Cnpj", TextRule::CNPJ),
            ElementRule::text(Ns::Types, "InscricaoMunicipal", TextRule::REGISTRATION),
            ElementRule::text(Ns::Types, "CodigoMunicipio", TextRule::MUNICIPAL_CODE),
        ]),
    );
    let request = ElementRule::new(
        Ns::Types,
        "InfPedidoCancelamento",
        Content::Sequence(vec![
            invoice,
            ElementRule::text(Ns::Types, "CodigoCancelamento", TextRule::Token { min: 1, max: 4 }),
        ]),
    )
    .requires_attribute("Id");
    let pedido = ElementRule::new(
        Ns::Unqualified,
        "Pedido",
        Content::Sequence(vec![request, ElementRule::signature()]),
    );
    ElementRule::new(
        Ns::Service,
        "CancelarNfseEnvio",
        Content::Sequence(vec![pedido, ElementRule::signature()]),
    )
}

//! # nfse-schema — Request Schema Validation
//!
//! Validation is a trust boundary: a payload that does not conform to the
//! authority's schema never leaves the process.
//!
//! ## Validator Contract (`validate`)
//!
//! [`SchemaValidator`] checks a finished document against one schema file.
//! Any XSD engine can sit behind it; the orchestrator only sees
//! pass/fail plus structured [`Violation`]s.
//!
//! ## Schema Files (`schema_set`)
//!
//! [`SchemaSet`] resolves `<schema dir>/<schema file>` for every operation.
//! The directory is read-only deployment data.
//!
//! ## Built-in Structural Validator (`structural`, `model`)
//!
//! [`StructuralValidator`] encodes the content models of the six v03 request
//! schemas: element order, namespaces, required attributes, text patterns
//! (CNPJ, CPF, dates, digit strings), the 1..=50 RPS bound, and the optional
//! trailing enveloped `Signature`.
//!
//! ## Crate Policy
//!
//! - Depends only on `nfse-core` internally.
//! - Malformed documents are validation failures, never panics.

pub mod document;
pub mod model;
pub mod schema_set;
pub mod structural;
pub mod validate;

pub use model::{Content, ElementRule, Ns, SchemaModel, TextRule};
pub use schema_set::SchemaSet;
pub use structural::StructuralValidator;
pub use validate::{SchemaValidationError, SchemaValidator, ValidationViolations, Violation, ViolationKind};

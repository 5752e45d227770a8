//! # nfse-core — Foundational Types for the NFSe Client
//!
//! This crate defines the types every other crate in the workspace builds
//! on. It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Validated identity at startup.** `ProviderIdentity` can only be
//!    obtained through a validating constructor. A missing CNPJ surfaces when
//!    the configuration is loaded, not halfway through XML construction.
//!
//! 2. **Static operation metadata.** Every web-service operation has exactly
//!    one `OperationDescriptor`: wire name, root element, signature stages,
//!    and schema file. Adding an operation forces every `match` to handle it.
//!
//! 3. **Profile-gated operations.** Whether an authority accepts an operation
//!    is data (`AuthorityProfile`), not an empty method body.
//!
//! 4. **One error taxonomy.** `NfseError` carries the pipeline failure kinds:
//!    limit exceeded, validation failed, signing failed, transport failure,
//!    and unsupported operation.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `nfse-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod config;
pub mod endpoint;
pub mod error;
pub mod identity;
pub mod lot;
pub mod operation;
pub mod query;

// Re-export primary types for ergonomic imports.
pub use config::{NfseConfig, ProviderConfig};
pub use endpoint::{EndpointCatalog, MunicipalityEndpoints, ResolvedEndpoint};
pub use error::{BuildError, ConfigError, NfseError, SigningError, TransportError};
pub use identity::{Environment, ProviderIdentity};
pub use lot::{LotEnvelope, PrerenderedRps, RenderError, RpsItem, MAX_RPS_PER_LOT};
pub use operation::{
    AuthorityProfile, Canonicalization, DigestAlgorithm, Operation, OperationDescriptor, SignatureStage,
    DSIG_NAMESPACE, TYPES_NAMESPACE,
};
pub use query::{CancellationCode, RpsIdentification, TakerFilter, TakerId};

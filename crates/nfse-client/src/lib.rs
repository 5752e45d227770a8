//! # nfse-client — NFSe Request Pipeline
//!
//! Builds, signs, normalizes, validates and transmits requests to the
//! municipal NFSe web service (ABRASF v03 layout, São José dos Pinhais).
//!
//! ## Architecture
//!
//! - `builders`: one pure function per operation producing the unsigned
//!   document.
//! - `signing`: the [`SignatureApplier`] seam, multi-stage application and
//!   the [`MockSigner`].
//! - `transport`: the [`Transport`] seam and the [`MockTransport`].
//! - `http_transport`: [`SoapHttpTransport`], SOAP 1.1 over `reqwest`.
//! - `client`: [`NfseClient`], the orchestrator.
//!
//! The signing primitive, certificates and XSD engines live outside this
//! workspace and plug in through the traits above.

pub mod builders;
pub mod client;
pub mod http_transport;
pub mod signing;
pub mod transport;

pub use client::{NfseClient, NfseClientBuilder};
pub use http_transport::{SoapHttpTransport, SoapTransportConfig};
pub use signing::{apply_stages, MockSigner, SignatureApplier};
pub use transport::{MockTransport, SentRequest, Transport};

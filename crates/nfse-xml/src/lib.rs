//! # nfse-xml — XML Construction Primitives
//!
//! Request documents are assembled as an [`Element`] tree and serialized
//! through `quick-xml`, never by string concatenation:
//!
//! - Text content and attribute values are always escaped.
//! - A prefixed element or attribute name must have its prefix declared on
//!   the element itself or an ancestor; otherwise serialization fails.
//! - Caller-rendered fragments (RPS) are inserted raw, after
//!   [`check_well_formed`] has accepted them.
//!
//! [`strip_xml_declarations`] is the normalization step applied after each
//! signature stage: signers return a full document with its own prolog,
//! and the authority accepts payloads with no prolog at all.

pub mod element;
pub mod error;
pub mod fragment;
pub mod prolog;

pub use element::{Element, Node};
pub use error::XmlError;
pub use fragment::check_well_formed;
pub use prolog::{count_xml_declarations, strip_xml_declarations};

//! XML construction errors.

use thiserror::Error;

/// Errors raised while building or checking XML.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XmlError {
    /// An element or attribute name is not a valid XML name.
    #[error("invalid XML name {0:?}")]
    InvalidName(String),

    /// A prefixed name was used where its prefix is not in scope.
    #[error("prefix '{prefix}' used by <{name}> is not declared in scope")]
    UndeclaredPrefix {
        /// The undeclared prefix.
        prefix: String,
        /// The element or attribute name that uses it.
        name: String,
    },

    /// The underlying writer failed.
    #[error("write error: {0}")]
    Write(String),

    /// A fragment is not well-formed XML.
    #[error("malformed XML: {0}")]
    Malformed(String),
}

//! # Validator Contract
//!
//! The [`SchemaValidator`] trait and its structured error types.
//!
//! ## Security Invariant
//!
//! Callers must treat anything other than `Ok(())` as a rejection. There is
//! no "valid with warnings" outcome: a schema that cannot be loaded fails
//! the same way a non-conforming document does.

use std::fmt;
use std::path::Path;

use thiserror::Error;

/// Error during schema validation.
#[derive(Error, Debug)]
pub enum SchemaValidationError {
    /// The document did not conform to the schema.
    #[error("validation failed against schema '{schema_name}':\n{violations}")]
    ValidationFailed {
        /// Name of the schema that was validated against.
        schema_name: String,
        /// Structured list of individual violations.
        violations: ValidationViolations,
    },

    /// The schema could not be loaded or is unknown to the validator.
    #[error("schema load error for '{schema_name}': {reason}")]
    SchemaLoadError {
        /// Schema filename or identifier.
        schema_name: String,
        /// Reason the schema could not be loaded.
        reason: String,
    },
}

impl SchemaValidationError {
    /// Name of the schema involved in the failure.
    pub fn schema_name(&self) -> &str {
        match self {
            Self::ValidationFailed { schema_name, .. } | Self::SchemaLoadError { schema_name, .. } => {
                schema_name
            }
        }
    }
}

/// What went wrong at one element of a request document.
///
/// Element names are rendered in Clark notation (`{namespace}local`) so a
/// violation states the qualified name the schema expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    /// The document is not well-formed or uses an unbound prefix.
    Malformed(String),
    /// The root element is not the one the schema declares.
    WrongRoot { expected: String, found: String },
    /// A required child element is absent.
    MissingElement(String),
    /// A child element the content model does not allow at this position.
    UnexpectedElement { found: String, expected: Option<String> },
    /// A repeated element occurs outside its `minOccurs..=maxOccurs` range.
    Occurrence {
        element: String,
        count: usize,
        min: usize,
        max: usize,
    },
    /// A required attribute is absent or blank.
    MissingAttribute(String),
    /// Simple content does not match its type.
    InvalidText(String),
    /// Character data in element-only content, or elements in simple content.
    MisplacedContent(String),
    /// Message reported verbatim by an external XSD engine.
    Engine(String),
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(reason) => write!(f, "malformed document: {reason}"),
            Self::WrongRoot { expected, found } => {
                write!(f, "expected root element {expected}, found {found}")
            }
            Self::MissingElement(name) => write!(f, "missing element {name}"),
            Self::UnexpectedElement {
                found,
                expected: Some(expected),
            } => write!(f, "unexpected element {found}, expected {expected}"),
            Self::UnexpectedElement { found, expected: None } => {
                write!(f, "unexpected element {found}")
            }
            Self::Occurrence {
                element,
                count,
                min,
                max,
            } => write!(f, "{count} {element} element(s), expected {min}..={max}"),
            Self::MissingAttribute(name) => write!(f, "missing required attribute '{name}'"),
            Self::InvalidText(reason) | Self::MisplacedContent(reason) | Self::Engine(reason) => {
                f.write_str(reason)
            }
        }
    }
}

/// One violation, located by the slash-separated local-name path of the
/// offending element (`/ConsultarNfseEnvio/Prestador`). An empty path
/// stands for the document as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub kind: ViolationKind,
}

impl Violation {
    pub fn new(path: impl Into<String>, kind: ViolationKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Whether the violation concerns the document rather than an element.
    pub fn is_document_level(&self) -> bool {
        self.path.is_empty()
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_document_level() {
            write!(f, "(document): {}", self.kind)
        } else {
            write!(f, "{}: {}", self.path, self.kind)
        }
    }
}

/// Every violation found in one document, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationViolations(Vec<Violation>);

impl ValidationViolations {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self(violations)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.0.iter()
    }

    /// Violations reported at `path` or below it.
    pub fn under<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a Violation> + 'a {
        self.0.iter().filter(move |v| {
            v.path == path
                || v.path
                    .strip_prefix(path)
                    .map_or(false, |rest| rest.starts_with('/'))
        })
    }
}

impl IntoIterator for ValidationViolations {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<Violation> for ValidationViolations {
    fn from_iter<I: IntoIterator<Item = Violation>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One indented line per violation.
impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {v}")?;
        }
        Ok(())
    }
}

/// Checks finished documents against an authoritative schema file.
///
/// Implementations must be `Send + Sync` so one validator can serve
/// concurrent pipeline runs. The trait is object-safe.
pub trait SchemaValidator: Send + Sync {
    /// Validate `xml` against the schema at `schema_path`.
    fn validate(&self, xml: &str, schema_path: &Path) -> Result<(), SchemaValidationError>;

    /// Whether `xml` conforms to the schema at `schema_path`.
    fn is_valid(&self, xml: &str, schema_path: &Path) -> bool {
        self.validate(xml, schema_path).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Reject;

    impl SchemaValidator for Reject {
        fn validate(&self, _xml: &str, schema_path: &Path) -> Result<(), SchemaValidationError> {
            Err(SchemaValidationError::ValidationFailed {
                schema_name: schema_path.display().to_string(),
                violations: ValidationViolations::new(vec![Violation::new(
                    "/A",
                    ViolationKind::Engine("bad".into()),
                )]),
            })
        }
    }

    #[test]
    fn is_valid_follows_validate() {
        assert!(!Reject.is_valid("<A/>", Path::new("a.xsd")));
    }

    #[test]
    fn violations_render_one_per_line() {
        let v = ValidationViolations::new(vec![
            Violation::new("", ViolationKind::Malformed("no root element".into())),
            Violation::new("/A/B", ViolationKind::MissingElement("{urn:t}C".into())),
        ]);
        assert_eq!(
            v.to_string(),
            "  (document): malformed document: no root element\n  /A/B: missing element {urn:t}C"
        );
        assert_eq!(v.len(), 2);
    }

    #[test]
    fn occurrence_names_the_bounds() {
        let kind = ViolationKind::Occurrence {
            element: "Rps".into(),
            count: 51,
            min: 1,
            max: 50,
        };
        assert_eq!(kind.to_string(), "51 Rps element(s), expected 1..=50");
    }

    #[test]
    fn under_selects_a_subtree() {
        let v: ValidationViolations = [
            Violation::new("/R/Prestador", ViolationKind::MissingElement("Cnpj".into())),
            Violation::new("/R/Prestador/Cnpj", ViolationKind::InvalidText("14 digits".into())),
            Violation::new("/R/PrestadorX", ViolationKind::MissingElement("Y".into())),
        ]
        .into_iter()
        .collect();
        assert_eq!(v.under("/R/Prestador").count(), 2);
    }

    #[test]
    fn error_exposes_schema_name() {
        let err = SchemaValidationError::SchemaLoadError {
            schema_name: "x.xsd".into(),
            reason: "unknown".into(),
        };
        assert_eq!(err.schema_name(), "x.xsd");
    }

    #[test]
    fn trait_is_object_safe() {
        let _: Box<dyn SchemaValidator> = Box::new(Reject);
    }
}

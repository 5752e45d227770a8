//! # Structural Validator
//!
//! Checks documents against the built-in [`SchemaModel`]s. The schema file
//! selects the model by name and must exist on disk: it is read on every
//! call and has to be an XML Schema whose `targetNamespace` and top-level
//! root element match the model. Anything else is a load error, so a
//! misconfigured schema directory fails closed.

use std::path::Path;

use crate::document::{self, XmlNode};
use crate::model::{Content, ElementRule, SchemaModel};
use crate::validate::{SchemaValidationError, SchemaValidator, ValidationViolations, Violation, ViolationKind};

/// Validator backed by the built-in request content models.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralValidator;

impl StructuralValidator {
    /// Create a structural validator.
    pub fn new() -> Self {
        Self
    }

    /// Check `xml` against `model`, collecting every violation.
    pub fn check(&self, xml: &str, model: &SchemaModel) -> Vec<Violation> {
        let root = match document::parse(xml) {
            Ok(root) => root,
            Err(reason) => return vec![Violation::new("", ViolationKind::Malformed(reason))],
        };
        let mut checker = Checker {
            model,
            violations: Vec::new(),
        };
        let path = format!("/{}", root.local_name);
        if checker.matches(&model.root, &root) {
            checker.element(&model.root, &root, &path);
        } else {
            let kind = ViolationKind::WrongRoot {
                expected: checker.describe(&model.root),
                found: describe_node(&root),
            };
            checker.push(&path, kind);
        }
        checker.violations
    }
}

impl SchemaValidator for StructuralValidator {
    fn validate(&self, xml: &str, schema_path: &Path) -> Result<(), SchemaValidationError> {
        let schema_name = schema_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let model = load_model(&schema_name, schema_path)?;

        let violations = self.check(xml, &model);
        tracing::debug!(
            schema = %schema_name,
            violations = violations.len(),
            "structural validation finished"
        );
        if violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaValidationError::ValidationFailed {
                schema_name,
                violations: ValidationViolations::new(violations),
            })
        }
    }
}

const XML_SCHEMA_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// Resolve the model for `schema_path` and confirm the file on disk
/// describes the same document.
fn load_model(schema_name: &str, schema_path: &Path) -> Result<SchemaModel, SchemaValidationError> {
    let load_error = |reason: String| SchemaValidationError::SchemaLoadError {
        schema_name: schema_path.display().to_string(),
        reason,
    };

    let model = SchemaModel::for_schema_file(schema_name)
        .ok_or_else(|| load_error("no content model is known for this schema".to_string()))?;
    let source = std::fs::read_to_string(schema_path)
        .map_err(|e| load_error(format!("cannot read schema file: {e}")))?;
    let schema = document::parse(&source).map_err(|e| load_error(format!("unparseable schema: {e}")))?;

    if schema.local_name != "schema" || schema.namespace.as_deref() != Some(XML_SCHEMA_NAMESPACE) {
        return Err(load_error(format!("root element is {}, not xs:schema", describe_node(&schema))));
    }
    match schema.attribute("targetNamespace") {
        Some(ns) if ns == model.namespace => {}
        other => {
            return Err(load_error(format!(
                "targetNamespace {} does not match {}",
                other.unwrap_or("(none)"),
                model.namespace
            )))
        }
    }
    let declares_root = schema.children.iter().any(|child| {
        child.local_name == "element"
            && child.namespace.as_deref() == Some(XML_SCHEMA_NAMESPACE)
            && child.attribute("name") == Some(model.root.name)
    });
    if !declares_root {
        return Err(load_error(format!("no top-level declaration of {}", model.root.name)));
    }
    Ok(model)
}

struct Checker<'m> {
    model: &'m SchemaModel,
    violations: Vec<Violation>,
}

impl Checker<'_> {
    fn push(&mut self, path: &str, kind: ViolationKind) {
        self.violations.push(Violation::new(path, kind));
    }

    fn matches(&self, rule: &ElementRule, node: &XmlNode) -> bool {
        rule.name == node.local_name && self.model.resolve(rule.ns) == node.namespace.as_deref()
    }

    fn describe(&self, rule: &ElementRule) -> String {
        match self.model.resolve(rule.ns) {
            Some(ns) => format!("{{{ns}}}{}", rule.name),
            None => rule.name.to_string(),
        }
    }

    fn element(&mut self, rule: &ElementRule, node: &XmlNode, path: &str) {
        if let Some(attr) = rule.required_attribute {
            match node.attribute(attr) {
                Some(v) if !v.trim().is_empty() => {}
                _ => self.push(path, ViolationKind::MissingAttribute(attr.to_string())),
            }
        }

        match &rule.content {
            Content::Any => {}
            Content::Text(text_rule) => {
                if let Some(child) = node.children.first() {
                    self.push(
                        path,
                        ViolationKind::MisplacedContent(format!(
                            "simple content expected, found element {}",
                            describe_node(child)
                        )),
                    );
                } else if let Err(reason) = text_rule.check(&node.text) {
                    self.push(path, ViolationKind::InvalidText(reason));
                }
            }
            Content::Sequence(rules) => {
                self.no_text(node, path);
                self.sequence(rules, &node.children, path);
            }
            Content::Choice(options) => {
                self.no_text(node, path);
                self.choice(options, &node.children, path);
            }
            Content::List { item, min, max } => {
                self.no_text(node, path);
                let count = node.children.len();
                if count < *min || count > *max {
                    self.push(
                        path,
                        ViolationKind::Occurrence {
                            element: item.name.to_string(),
                            count,
                            min: *min,
                            max: *max,
                        },
                    );
                }
                for child in &node.children {
                    let child_path = format!("{path}/{}", child.local_name);
                    if self.matches(item, child) {
                        self.element(item, child, &child_path);
                    } else {
                        let kind = ViolationKind::UnexpectedElement {
                            found: describe_node(child),
                            expected: Some(self.describe(item)),
                        };
                        self.push(&child_path, kind);
                    }
                }
            }
        }
    }

    fn no_text(&mut self, node: &XmlNode, path: &str) {
        if !node.text.trim().is_empty() {
            self.push(
                path,
                ViolationKind::MisplacedContent("character data is not allowed here".to_string()),
            );
        }
    }

    fn sequence(&mut self, rules: &[ElementRule], children: &[XmlNode], path: &str) {
        let mut next = 0;
        for rule in rules {
            match children.get(next) {
                Some(child) if self.matches(rule, child) => {
                    self.element(rule, child, &format!("{path}/{}", child.local_name));
                    next += 1;
                }
                _ if rule.optional => {}
                _ => self.push(path, ViolationKind::MissingElement(self.describe(rule))),
            }
        }
        for extra in &children[next..] {
            self.push(
                &format!("{path}/{}", extra.local_name),
                ViolationKind::UnexpectedElement {
                    found: describe_node(extra),
                    expected: None,
                },
            );
        }
    }

    fn choice(&mut self, options: &[ElementRule], children: &[XmlNode], path: &str) {
        let expected = || {
            options
                .iter()
                .map(|o| o.name)
                .collect::<Vec<_>>()
                .join(" | ")
        };
        match children {
            [only] => match options.iter().find(|o| self.matches(o, only)) {
                Some(rule) => self.element(rule, only, &format!("{path}/{}", only.local_name)),
                None => self.push(
                    path,
                    ViolationKind::UnexpectedElement {
                        found: describe_node(only),
                        expected: Some(format!("one of {}", expected())),
                    },
                ),
            },
            _ => self.push(
                path,
                ViolationKind::Occurrence {
                    element: expected(),
                    count: children.len(),
                    min: 1,
                    max: 1,
                },
            ),
        }
    }
}

fn describe_node(node: &XmlNode) -> String {
    match &node.namespace {
        Some(ns) => format!("{{{ns}}}{}", node.local_name),
        None => node.local_name.clone(),
    }
}

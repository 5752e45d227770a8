//! # Element Tree
//!
//! A small owned element tree serialized through `quick-xml`.
//!
//! Namespace declarations are ordinary attributes (`xmlns`, `xmlns:p`) and
//! keep their insertion order, so the serialized start tag is byte-for-byte
//! predictable. Serialization tracks which prefixes are in scope and fails
//! with [`XmlError::UndeclaredPrefix`] instead of emitting a document a
//! namespace-aware parser would reject.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::XmlError;

/// A child of an [`Element`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A nested element.
    Element(Element),
    /// Text content, escaped on output.
    Text(String),
    /// Pre-rendered markup, written verbatim.
    Fragment(String),
}

/// An XML element with ordered attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    /// Create an element with a (possibly prefixed) name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create an element whose only child is `text`.
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name).with_text(text)
    }

    /// Declare the default namespace on this element.
    pub fn with_default_namespace(self, uri: impl Into<String>) -> Self {
        self.with_attribute("xmlns", uri)
    }

    /// Bind `prefix` to `uri` on this element.
    pub fn with_namespace(self, prefix: &str, uri: impl Into<String>) -> Self {
        self.with_attribute(format!("xmlns:{prefix}"), uri)
    }

    /// Append an attribute. The value is escaped on output.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Append a child element.
    pub fn with_child(mut self, child: Element) -> Self {
        self.push_child(child);
        self
    }

    /// Append text content.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Append pre-rendered markup.
    pub fn with_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.children.push(Node::Fragment(fragment.into()));
        self
    }

    /// Append a child element in place.
    pub fn push_child(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Element name as given at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attributes in insertion order, namespace declarations included.
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Children in insertion order.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// First child element with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find_map(|n| match n {
            Node::Element(e) if e.name == name => Some(e),
            _ => None,
        })
    }

    /// Serialize the tree without an XML declaration.
    ///
    /// # Errors
    ///
    /// Fails on invalid names, out-of-scope prefixes, or writer errors.
    pub fn to_xml(&self) -> Result<String, XmlError> {
        let mut writer = Writer::new(Vec::new());
        let mut scope = Vec::new();
        self.write(&mut writer, &mut scope)?;
        String::from_utf8(writer.into_inner()).map_err(|e| XmlError::Write(e.to_string()))
    }

    fn write(&self, writer: &mut Writer<Vec<u8>>, scope: &mut Vec<String>) -> Result<(), XmlError> {
        validate_name(&self.name)?;
        let scope_len = scope.len();
        for (key, _) in &self.attributes {
            validate_name(key)?;
            if let Some(prefix) = key.strip_prefix("xmlns:") {
                scope.push(prefix.to_string());
            }
        }

        check_prefix(&self.name, scope)?;
        for (key, _) in &self.attributes {
            if key != "xmlns" && !key.starts_with("xmlns:") {
                check_prefix(key, scope)?;
            }
        }

        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() {
            write_event(writer, Event::Empty(start))?;
        } else {
            write_event(writer, Event::Start(start))?;
            for child in &self.children {
                match child {
                    Node::Element(e) => e.write(writer, scope)?,
                    Node::Text(t) => write_event(writer, Event::Text(BytesText::new(t)))?,
                    Node::Fragment(f) => writer.get_mut().extend_from_slice(f.as_bytes()),
                }
            }
            write_event(writer, Event::End(BytesEnd::new(self.name.as_str())))?;
        }

        scope.truncate(scope_len);
        Ok(())
    }
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), XmlError> {
    writer
        .write_event(event)
        .map_err(|e| XmlError::Write(e.to_string()))
}

fn check_prefix(name: &str, scope: &[String]) -> Result<(), XmlError> {
    match name.split_once(':') {
        Some(("xml", _)) | None => Ok(()),
        Some((prefix, _)) if scope.iter().any(|p| p == prefix) => Ok(()),
        Some((prefix, _)) => Err(XmlError::UndeclaredPrefix {
            prefix: prefix.to_string(),
            name: name.to_string(),
        }),
    }
}

fn validate_name(name: &str) -> Result<(), XmlError> {
    let invalid = || XmlError::InvalidName(name.to_string());
    let mut parts = name.split(':');
    let first = parts.next().ok_or_else(invalid)?;
    let second = parts.next();
    if parts.next().is_some() {
        return Err(invalid());
    }
    for part in std::iter::once(first).chain(second) {
        let mut chars = part.chars();
        let head = chars.next().ok_or_else(invalid)?;
        if !(head.is_alphabetic() || head == '_') {
            return Err(invalid());
        }
        if !chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.')) {
            return Err(invalid());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use quick_xml::Reader;

    #[test]
    fn serializes_nested_tree_in_order() {
        let xml = Element::new("Root")
            .with_default_namespace("urn:root")
            .with_namespace("t", "urn:types")
            .with_child(Element::text("t:A", "1"))
            .with_child(Element::text("t:B", "2"))
            .to_xml()
            .unwrap();
        assert_eq!(
            xml,
            r#"<Root xmlns="urn:root" xmlns:t="urn:types"><t:A>1</t:A><t:B>2</t:B></Root>"#
        );
    }

    #[test]
    fn attribute_order_is_preserved() {
        let xml = Element::new("LoteRps")
            .with_attribute("Id", "10")
            .with_namespace("tipos", "urn:t")
            .with_child(Element::text("tipos:NumeroLote", "10"))
            .to_xml()
            .unwrap();
        assert_eq!(
            xml,
            r#"<LoteRps Id="10" xmlns:tipos="urn:t"><tipos:NumeroLote>10</tipos:NumeroLote></LoteRps>"#
        );
    }

    #[test]
    fn text_and_attributes_are_escaped() {
        let xml = Element::new("A")
            .with_attribute("Id", r#"x"><evil/>"#)
            .with_text("</A><B>&")
            .to_xml()
            .unwrap();
        assert!(!xml.contains("<evil/>"));
        assert!(!xml.contains("<B>"));
        assert!(xml.contains("&lt;/A&gt;&lt;B&gt;&amp;"));
    }

    #[test]
    fn empty_text_keeps_start_and_end_tags() {
        let xml = Element::text("Protocolo", "").to_xml().unwrap();
        assert_eq!(xml, "<Protocolo></Protocolo>");
    }

    #[test]
    fn childless_element_is_self_closing() {
        assert_eq!(Element::new("X").to_xml().unwrap(), "<X/>");
    }

    #[test]
    fn fragments_are_written_verbatim() {
        let xml = Element::new("tipos:ListaRps")
            .with_fragment("<tipos:Rps>1</tipos:Rps>")
            .with_fragment("<tipos:Rps>2</tipos:Rps>");
        let root = Element::new("LoteRps")
            .with_namespace("tipos", "urn:t")
            .with_child(xml);
        assert_eq!(
            root.to_xml().unwrap(),
            r#"<LoteRps xmlns:tipos="urn:t"><tipos:ListaRps><tipos:Rps>1</tipos:Rps><tipos:Rps>2</tipos:Rps></tipos:ListaRps></LoteRps>"#
        );
    }

    #[test]
    fn undeclared_prefix_is_rejected() {
        let err = Element::new("Root")
            .with_child(Element::text("tipos:Cnpj", "1"))
            .to_xml()
            .unwrap_err();
        assert_eq!(
            err,
            XmlError::UndeclaredPrefix {
                prefix: "tipos".into(),
                name: "tipos:Cnpj".into()
            }
        );
    }

    #[test]
    fn prefix_goes_out_of_scope_after_element() {
        let err = Element::new("Root")
            .with_child(Element::new("A").with_namespace("p", "urn:p"))
            .with_child(Element::new("p:B"))
            .to_xml()
            .unwrap_err();
        assert!(matches!(err, XmlError::UndeclaredPrefix { .. }));
    }

    #[test]
    fn invalid_names_are_rejected() {
        for name in ["", "1abc", "a b", "a:b:c", ":a", "a:", "a<b"] {
            assert!(
                matches!(Element::new(name).to_xml(), Err(XmlError::InvalidName(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn child_lookup_by_name() {
        let root = Element::new("R")
            .with_child(Element::text("A", "1"))
            .with_child(Element::text("B", "2"));
        assert_eq!(root.child("B").map(Element::name), Some("B"));
        assert!(root.child("C").is_none());
    }

    fn read_text(xml: &str) -> String {
        let mut reader = Reader::from_str(xml);
        let mut out = String::new();
        loop {
            match reader.read_event().unwrap() {
                quick_xml::events::Event::Text(t) => out.push_str(&t.unescape().unwrap()),
                quick_xml::events::Event::Eof => break,
                _ => {}
            }
        }
        out
    }

    proptest! {
        #[test]
        fn any_text_survives_escaping(text in "[ -~]{1,64}") {
            let xml = Element::text("DataInicial", text.clone()).to_xml().unwrap();
            prop_assert_eq!(read_text(&xml), text);
        }
    }
}

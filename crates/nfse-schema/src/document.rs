//! Namespace-resolved document tree used by the structural validator.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

/// One element of a parsed document, with its namespace resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlNode {
    /// Namespace URI, `None` when the element is in no namespace.
    pub namespace: Option<String>,
    /// Local name without prefix.
    pub local_name: String,
    /// Non-namespace attributes as (local name, unescaped value).
    pub attributes: Vec<(String, String)>,
    /// Element children in document order.
    pub children: Vec<XmlNode>,
    /// Concatenated, unescaped character data directly inside the element.
    pub text: String,
}

impl XmlNode {
    /// Value of the attribute with local name `name`.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn open(namespace: Option<String>, start: &BytesStart<'_>) -> Result<Self, String> {
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| e.to_string())?;
            let key = attr.key.as_ref();
            if key == b"xmlns" || key.starts_with(b"xmlns:") {
                continue;
            }
            let name = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value().map_err(|e| e.to_string())?.into_owned();
            attributes.push((name, value));
        }
        Ok(Self {
            namespace,
            local_name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
            attributes,
            children: Vec::new(),
            text: String::new(),
        })
    }
}

/// Parse `xml` into its root element.
///
/// Fails on malformed input, unbound prefixes, missing or multiple roots,
/// and character data outside the root.
pub fn parse(xml: &str) -> Result<XmlNode, String> {
    let mut reader = NsReader::from_str(xml);
    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        let (resolved, event) = reader
            .read_resolved_event()
            .map_err(|e| format!("malformed document: {e}"))?;
        let namespace = namespace_of(resolved)?;
        match event {
            Event::Start(e) => stack.push(XmlNode::open(namespace, &e)?),
            Event::Empty(e) => {
                let node = XmlNode::open(namespace, &e)?;
                attach(node, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| "closing tag without an open element".to_string())?;
                attach(node, &mut stack, &mut root)?;
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(|e| e.to_string())?;
                match stack.last_mut() {
                    Some(top) => top.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => return Err("character data outside the root element".to_string()),
                }
            }
            Event::CData(c) => match stack.last_mut() {
                Some(top) => top.text.push_str(&String::from_utf8_lossy(&c)),
                None => return Err("CDATA outside the root element".to_string()),
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(format!("{} element(s) left open", stack.len()));
    }
    root.ok_or_else(|| "document has no root element".to_string())
}

fn namespace_of(resolved: ResolveResult<'_>) -> Result<Option<String>, String> {
    match resolved {
        ResolveResult::Bound(ns) => Ok(Some(String::from_utf8_lossy(ns.as_ref()).into_owned())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(format!(
            "prefix '{}' is not bound to a namespace",
            String::from_utf8_lossy(&prefix)
        )),
    }
}

fn attach(node: XmlNode, stack: &mut [XmlNode], root: &mut Option<XmlNode>) -> Result<(), String> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(node);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(node);
            Ok(())
        }
        None => Err(format!("second root element <{}>", node.local_name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_default_and_prefixed_namespaces() {
        let root = parse(
            r#"<R xmlns="urn:svc"><A xmlns:t="urn:t"><t:B>1 &amp; 2</t:B></A><C xmlns=""/></R>"#,
        )
        .unwrap();
        assert_eq!(root.namespace.as_deref(), Some("urn:svc"));
        let a = &root.children[0];
        assert_eq!(a.namespace.as_deref(), Some("urn:svc"));
        assert_eq!(a.children[0].namespace.as_deref(), Some("urn:t"));
        assert_eq!(a.children[0].local_name, "B");
        assert_eq!(a.children[0].text, "1 & 2");
        assert_eq!(root.children[1].namespace, None);
    }

    #[test]
    fn namespace_declarations_are_not_attributes() {
        let root = parse(r#"<p:R xmlns:p="urn:p" Id="x1"/>"#).unwrap();
        assert_eq!(root.attributes, vec![("Id".to_string(), "x1".to_string())]);
        assert_eq!(root.attribute("Id"), Some("x1"));
    }

    #[test]
    fn unbound_prefix_is_rejected() {
        assert!(parse("<tipos:A/>").unwrap_err().contains("tipos"));
    }

    #[test]
    fn structural_errors_are_rejected() {
        assert!(parse("<a><b></a>").is_err());
        assert!(parse("<a/><b/>").is_err());
        assert!(parse("text<a/>").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn prolog_and_whitespace_are_tolerated() {
        let root = parse("<?xml version=\"1.0\"?>\n<a>\n  <b/>\n</a>\n").unwrap();
        assert_eq!(root.children.len(), 1);
    }
}

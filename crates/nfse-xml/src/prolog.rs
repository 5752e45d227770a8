//! # XML Declaration Normalization
//!
//! A signer returns a complete document, prolog included. Chaining two
//! signature stages, or handing the result to a SOAP body, leaves one or
//! more `<?xml ...?>` declarations where the authority accepts none.
//!
//! [`strip_xml_declarations`] removes every XML declaration the markup
//! carries, together with the whitespace that directly follows it.
//! Declarations are located with the quick-xml reader, so text that merely
//! looks like one inside CDATA, comments or escaped character data is left
//! alone. Other processing instructions (`<?xml-stylesheet ...?>`) are
//! untouched.

use std::borrow::Cow;

use quick_xml::events::Event;
use quick_xml::Reader;

/// Remove every XML declaration from `xml`.
pub fn strip_xml_declarations(xml: &str) -> Cow<'_, str> {
    let spans = declaration_spans(xml);
    if spans.is_empty() {
        return Cow::Borrowed(xml);
    }

    let mut out = String::with_capacity(xml.len());
    let mut cursor = 0;
    for (start, end) in spans {
        out.push_str(&xml[cursor..start]);
        cursor = end;
        while let Some(c) = xml[cursor..].chars().next().filter(|c| c.is_whitespace()) {
            cursor += c.len_utf8();
        }
    }
    out.push_str(&xml[cursor..]);
    Cow::Owned(out)
}

/// Number of XML declarations in `xml`.
pub fn count_xml_declarations(xml: &str) -> usize {
    declaration_spans(xml).len()
}

/// Byte ranges of the XML declarations in `xml`, in document order.
///
/// End-tag names are not matched, so fragments and partially assembled
/// documents are scanned too. Scanning stops at the first syntax error;
/// declarations past that point are left for validation to report.
fn declaration_spans(xml: &str) -> Vec<(usize, usize)> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().check_end_names = false;

    let mut spans = Vec::new();
    loop {
        let before = reader.buffer_position();
        match reader.read_event() {
            Ok(Event::Decl(_)) => {
                let span = usize::try_from(before)
                    .ok()
                    .zip(usize::try_from(reader.buffer_position()).ok());
                match span {
                    Some((start, end)) if start < end && end <= xml.len() => spans.push((start, end)),
                    _ => break,
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            Ok(_) => {}
        }
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn document_without_declaration_is_borrowed() {
        let xml = "<a><b/></a>";
        assert!(matches!(strip_xml_declarations(xml), Cow::Borrowed(_)));
    }

    #[test]
    fn strips_both_common_forms() {
        let xml = "<?xml version=\"1.0\"?>\n<?xml version=\"1.0\" encoding=\"UTF-8\"?><a/>";
        assert_eq!(count_xml_declarations(xml), 2);
        assert_eq!(strip_xml_declarations(xml), "<a/>");
    }

    #[test]
    fn strips_declarations_in_the_middle() {
        let xml = "<a><?xml version=\"1.0\"?><b/></a>";
        assert_eq!(strip_xml_declarations(xml), "<a><b/></a>");
    }

    #[test]
    fn keeps_other_processing_instructions() {
        let xml = "<?xml-stylesheet href=\"s.xsl\"?><a/>";
        assert_eq!(count_xml_declarations(xml), 0);
        assert_eq!(strip_xml_declarations(xml), xml);
    }

    #[test]
    fn declaration_inside_cdata_is_untouched() {
        let xml = "<?xml version=\"1.0\"?><a><![CDATA[see <?xml version=\"1.0\"?> here]]></a>";
        assert_eq!(count_xml_declarations(xml), 1);
        assert_eq!(
            strip_xml_declarations(xml),
            "<a><![CDATA[see <?xml version=\"1.0\"?> here]]></a>"
        );
    }

    #[test]
    fn declaration_inside_comment_is_untouched() {
        let xml = "<a><!-- <?xml version=\"1.0\"?> --><b/></a>";
        assert_eq!(count_xml_declarations(xml), 0);
        assert!(matches!(strip_xml_declarations(xml), Cow::Borrowed(_)));
    }

    #[test]
    fn text_mentioning_xml_is_untouched() {
        let xml = "<a>&lt;?xml version=\"1.0\"?&gt;</a>";
        assert_eq!(strip_xml_declarations(xml), xml);
    }

    proptest! {
        #[test]
        fn stripping_is_idempotent_and_complete(
            body in "<[a-z]{1,8}>[a-z ]{0,16}</[a-z]{1,8}>",
            prologs in 0usize..4,
        ) {
            let mut xml = String::new();
            for _ in 0..prologs {
                xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
            }
            xml.push_str(&body);
            let once = strip_xml_declarations(&xml).into_owned();
            prop_assert_eq!(count_xml_declarations(&once), 0);
            prop_assert_eq!(&once, &body);
            prop_assert_eq!(strip_xml_declarations(&once), once.as_str());
        }
    }
}

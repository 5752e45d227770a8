//! Well-formedness check for pre-rendered fragments.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::XmlError;

/// Check that `fragment` is balanced, well-formed element content.
///
/// Namespace prefixes are not resolved: a fragment may use prefixes bound
/// by the document it is inserted into. XML declarations and doctypes are
/// rejected since they cannot appear inside an element.
pub fn check_well_formed(fragment: &str) -> Result<(), XmlError> {
    let mut reader = Reader::from_str(fragment);
    let mut depth = 0usize;
    let mut elements = 0usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| XmlError::Malformed(format!("at byte {}: {e}", reader.buffer_position())))?;
        match event {
            Event::Start(_) => {
                depth += 1;
                elements += 1;
            }
            Event::Empty(_) => elements += 1,
            Event::End(e) => {
                if depth == 0 {
                    return Err(XmlError::Malformed(format!(
                        "unexpected closing tag </{}>",
                        String::from_utf8_lossy(e.name().as_ref())
                    )));
                }
                depth -= 1;
            }
            Event::Decl(_) => {
                return Err(XmlError::Malformed(
                    "fragment must not carry an XML declaration".to_string(),
                ))
            }
            Event::DocType(_) => {
                return Err(XmlError::Malformed(
                    "fragment must not carry a doctype".to_string(),
                ))
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return Err(XmlError::Malformed(format!("{depth} element(s) left open")));
    }
    if elements == 0 {
        return Err(XmlError::Malformed("fragment contains no element".to_string()));
    }
    Ok(())
}

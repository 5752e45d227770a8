//! # Signature Application
//!
//! The signing primitive lives outside this workspace. [`SignatureApplier`]
//! is the seam: an implementation owns its certificate handle and inserts
//! one enveloped signature per [`SignatureStage`].
//!
//! [`apply_stages`] runs every stage of an operation in order and removes
//! the XML declaration each stage's output carries, so the next stage (and
//! the validator) sees a single-root document without prologs.
//!
//! [`MockSigner`] is a structural stand-in for development and tests. It
//! produces a `Signature` element in the right place with a real SHA-256
//! digest of the signed subtree, but the signature value is not a
//! cryptographic signature.

use parking_lot::Mutex;
use quick_xml::events::Event;
use quick_xml::Reader;
use sha2::{Digest, Sha256};

use nfse_core::{DigestAlgorithm, SignatureStage, SigningError, DSIG_NAMESPACE};
use nfse_xml::{strip_xml_declarations, Element};

const ENVELOPED_TRANSFORM: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";

/// Applies one enveloped signature to a document.
///
/// Implementations are bound to the certificate they sign with and must be
/// `Send + Sync` so one signer can serve concurrent pipeline runs.
pub trait SignatureApplier: Send + Sync {
    /// Sign `stage.signed_element` in `xml` and place the `Signature` as the
    /// last child of `stage.placement()`. Returns the complete document,
    /// which may start with an XML declaration.
    ///
    /// Elements are matched by local name, first occurrence in document
    /// order. Every request opens its signed element and placement before
    /// any caller-rendered RPS content, so an RPS fragment reusing one of
    /// those names cannot capture the signature. The placement must be the
    /// signed element or one of its ancestors.
    fn sign(&self, xml: &str, stage: &SignatureStage) -> Result<String, SigningError>;
}

/// Apply `stages` in order, stripping XML declarations after each one.
pub fn apply_stages(
    signer: &dyn SignatureApplier,
    xml: &str,
    stages: &[SignatureStage],
) -> Result<String, SigningError> {
    let mut document = xml.to_string();
    for stage in stages {
        let signed = signer.sign(&document, stage)?;
        document = strip_xml_declarations(&signed).into_owned();
        tracing::debug!(
            signed_element = stage.signed_element,
            placement = stage.placement(),
            "signature stage applied"
        );
    }
    Ok(document)
}

/// Byte offsets of the elements a stage touches.
struct Located {
    signed_start: usize,
    signed_end: usize,
    reference_id: Option<String>,
    placement: Placement,
}

enum Placement {
    /// Insert before the end tag starting at this offset.
    BeforeEnd(usize),
    /// Expand the empty element spanning this range.
    Empty(usize, usize),
}

fn locate(xml: &str, stage: &SignatureStage) -> Result<Located, SigningError> {
    let signed_name = stage.signed_element.as_bytes();
    let placement_name = stage.placement().as_bytes();

    let mut reader = Reader::from_str(xml);
    let mut depth = 0usize;
    let mut signed: Option<(usize, usize)> = None;
    let mut signed_end = None;
    let mut reference_id = None;
    let mut placement_depth = None;
    let mut placement = None;

    loop {
        let before = usize::try_from(reader.buffer_position())
            .map_err(|e| SigningError::MalformedDocument(e.to_string()))?;
        let event = reader
            .read_event()
            .map_err(|e| SigningError::MalformedDocument(e.to_string()))?;
        let after = usize::try_from(reader.buffer_position())
            .map_err(|e| SigningError::MalformedDocument(e.to_string()))?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let name = e.local_name();
                if signed.is_none() && name.as_ref() == signed_name {
                    if let Some(attr) = stage.id_attribute {
                        let value = e
                            .try_get_attribute(attr)
                            .map_err(|err| SigningError::MalformedDocument(err.to_string()))?
                            .ok_or_else(|| {
                                SigningError::MalformedDocument(format!(
                                    "element '{}' has no '{attr}' attribute",
                                    stage.signed_element
                                ))
                            })?;
                        let value = value
                            .unescape_value()
                            .map_err(|err| SigningError::MalformedDocument(err.to_string()))?;
                        reference_id = Some(value.into_owned());
                    }
                    signed = Some((before, depth));
                    if is_empty {
                        signed_end = Some(after);
                    }
                }
                let signed_here = signed.map_or(false, |(start, _)| start == before);
                if placement_depth.is_none() && placement.is_none() && name.as_ref() == placement_name {
                    if is_empty {
                        placement = Some(Placement::Empty(before, after));
                    } else {
                        placement_depth = Some(depth);
                    }
                }
                if signed_here && placement_depth.is_none() && placement.is_none() {
                    return Err(SigningError::MalformedDocument(format!(
                        "'{}' is not enclosed by '{}'",
                        stage.signed_element,
                        stage.placement()
                    )));
                }
                if !is_empty {
                    depth += 1;
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if let Some((_, d)) = signed {
                    if signed_end.is_none() && d == depth {
                        signed_end = Some(after);
                    }
                }
                if placement_depth == Some(depth) && placement.is_none() {
                    placement = Some(Placement::BeforeEnd(before));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let (signed_start, _) =
        signed.ok_or_else(|| SigningError::ElementNotFound(stage.signed_element.to_string()))?;
    let signed_end = signed_end
        .ok_or_else(|| SigningError::MalformedDocument(format!("'{}' is never closed", stage.signed_element)))?;
    let placement = placement.ok_or_else(|| SigningError::ElementNotFound(stage.placement().to_string()))?;

    Ok(Located {
        signed_start,
        signed_end,
        reference_id,
        placement,
    })
}

fn signature_method_uri(digest: DigestAlgorithm) -> &'static str {
    match digest {
        DigestAlgorithm::Sha1 => "http://www.w3.org/2000/09/xmldsig#rsa-sha1",
        DigestAlgorithm::Sha256 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256",
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Signer that inserts a structurally complete placeholder signature.
#[derive(Debug, Default)]
pub struct MockSigner {
    certificate_label: String,
    failure: Option<String>,
    calls: Mutex<Vec<SignatureStage>>,
}

impl MockSigner {
    /// A signer bound to a certificate identified by `certificate_label`.
    pub fn new(certificate_label: impl Into<String>) -> Self {
        Self {
            certificate_label: certificate_label.into(),
            ..Self::default()
        }
    }

    /// A signer whose certificate is unusable: every call fails.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Stages signed so far, in call order.
    pub fn calls(&self) -> Vec<SignatureStage> {
        self.calls.lock().clone()
    }

    /// Number of `sign` calls, failed ones included.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn signature_element(&self, stage: &SignatureStage, digest: &str, reference_id: Option<&str>) -> Element {
        let c14n = stage.canonicalization.algorithm_uri();
        let reference_uri = reference_id.map(|id| format!("#{id}")).unwrap_or_default();
        let mut value = Sha256::new();
        value.update(self.certificate_label.as_bytes());
        value.update(digest.as_bytes());

        Element::new("Signature")
            .with_default_namespace(DSIG_NAMESPACE)
            .with_child(
                Element::new("SignedInfo")
                    .with_child(Element::new("CanonicalizationMethod").with_attribute("Algorithm", c14n))
                    .with_child(
                        Element::new("SignatureMethod")
                            .with_attribute("Algorithm", signature_method_uri(stage.digest)),
                    )
                    .with_child(
                        Element::new("Reference")
                            .with_attribute("URI", reference_uri)
                            .with_child(
                                Element::new("Transforms")
                                    .with_child(
                                        Element::new("Transform").with_attribute("Algorithm", ENVELOPED_TRANSFORM),
                                    )
                                    .with_child(Element::new("Transform").with_attribute("Algorithm", c14n)),
                            )
                            .with_child(
                                Element::new("DigestMethod").with_attribute("Algorithm", stage.digest.digest_uri()),
                            )
                            .with_child(Element::text("DigestValue", digest)),
                    ),
            )
            .with_child(Element::text("SignatureValue", hex(&value.finalize())))
    }
}

impl SignatureApplier for MockSigner {
    fn sign(&self, xml: &str, stage: &SignatureStage) -> Result<String, SigningError> {
        self.calls.lock().push(*stage);
        if let Some(reason) = &self.failure {
            return Err(SigningError::Certificate(reason.clone()));
        }

        let located = locate(xml, stage)?;
        let digest = hex(&Sha256::digest(&xml.as_bytes()[located.signed_start..located.signed_end]));
        let signature = self
            .signature_element(stage, &digest, located.reference_id.as_deref())
            .to_xml()
            .map_err(|e| SigningError::MalformedDocument(e.to_string()))?;

        let mut out = String::with_capacity(xml.len() + signature.len() + 40);
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        match located.placement {
            Placement::BeforeEnd(at) => {
                out.push_str(&xml[..at]);
                out.push_str(&signature);
                out.push_str(&xml[at..]);
            }
            Placement::Empty(start, end) => {
                let tag = &xml[start..end];
                let open = tag.trim_end_matches("/>").trim_end();
                let name = open[1..].split_whitespace().next().unwrap_or_default();
                out.push_str(&xml[..start]);
                out.push_str(open);
                out.push('>');
                out.push_str(&signature);
                out.push_str(&format!("</{name}>"));
                out.push_str(&xml[end..]);
            }
        }
        Ok(out)
    }
}

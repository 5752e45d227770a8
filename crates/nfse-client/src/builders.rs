//! # Request Builders
//!
//! One pure function per operation: provider identity plus call parameters
//! in, unsigned request document out. Documents are assembled as
//! [`Element`] trees, so text is escaped and prefixes are checked by
//! construction. Element order and namespace declarations follow the
//! authority's v03 layouts exactly.

use nfse_core::{
    BuildError, CancellationCode, LotEnvelope, NfseError, Operation, ProviderIdentity,
    RpsIdentification, RpsItem, TakerFilter, TakerId, MAX_RPS_PER_LOT, TYPES_NAMESPACE,
};
use nfse_xml::{check_well_formed, strip_xml_declarations, Element, XmlError};

fn xml_error(e: XmlError) -> BuildError {
    BuildError::Xml(e.to_string())
}

fn render(root: Element) -> Result<String, NfseError> {
    Ok(root.to_xml().map_err(xml_error)?)
}

/// `Prestador` block with `tipos:`-qualified children.
fn provider_block(identity: &ProviderIdentity) -> Element {
    Element::new("Prestador")
        .with_child(Element::text("tipos:Cnpj", identity.tax_id()))
        .with_child(Element::text(
            "tipos:InscricaoMunicipal",
            identity.municipal_registration(),
        ))
}

/// Build the `EnviarLoteRpsEnvio` document for `lot`.
///
/// Oversized lots fail with [`NfseError::LimitExceeded`] before any item is
/// rendered. Each rendered fragment has its XML declarations removed and
/// must be well-formed; fragments are inserted in input order.
pub fn build_lot_submission<R: RpsItem>(
    identity: &ProviderIdentity,
    lot: &LotEnvelope<R>,
) -> Result<String, NfseError> {
    if !lot.within_limit() {
        return Err(NfseError::LimitExceeded {
            count: lot.item_count(),
            max: MAX_RPS_PER_LOT,
        });
    }

    let mut list = Element::new("tipos:ListaRps");
    for (index, item) in lot.items().iter().enumerate() {
        let rendered = item
            .render(identity)
            .map_err(|e| BuildError::RpsRender { index, reason: e.0 })?;
        let fragment = strip_xml_declarations(&rendered);
        check_well_formed(&fragment).map_err(|e| BuildError::MalformedFragment {
            index,
            reason: e.to_string(),
        })?;
        list = list.with_fragment(fragment.into_owned());
    }

    let descriptor = Operation::SubmitLot.descriptor();
    let lote = Element::new("LoteRps")
        .with_attribute("Id", lot.lot_number())
        .with_namespace("tipos", TYPES_NAMESPACE)
        .with_child(Element::text("tipos:NumeroLote", lot.lot_number()))
        .with_child(Element::text("tipos:Cnpj", identity.tax_id()))
        .with_child(Element::text(
            "tipos:InscricaoMunicipal",
            identity.municipal_registration(),
        ))
        .with_child(Element::text("tipos:QuantidadeRps", lot.item_count().to_string()))
        .with_child(list);

    render(
        Element::new(descriptor.root_element)
            .with_default_namespace(descriptor.namespace)
            .with_child(lote),
    )
}

/// Build the `ConsultarSituacaoLoteRpsEnvio` document.
pub fn build_lot_status_query(
    identity: &ProviderIdentity,
    protocol: &str,
) -> Result<String, NfseError> {
    let descriptor = Operation::QueryLotStatus.descriptor();
    render(
        Element::new(descriptor.root_element)
            .with_default_namespace(descriptor.namespace)
            .with_namespace("tipos", TYPES_NAMESPACE)
            .with_child(provider_block(identity))
            .with_child(Element::text("Protocolo", protocol)),
    )
}

/// Build the `ConsultarLoteRpsEnvio` document.
pub fn build_lot_retrieval(identity: &ProviderIdentity, protocol: &str) -> Result<String, NfseError> {
    let descriptor = Operation::RetrieveLot.descriptor();
    render(
        Element::new(descriptor.root_element)
            .with_namespace("tipos", TYPES_NAMESPACE)
            .with_default_namespace(descriptor.namespace)
            .with_child(provider_block(identity))
            .with_child(Element::text("Protocolo", protocol)),
    )
}

/// Build the `ConsultarNfseEnvio` document for invoices issued between
/// `start_date` and `end_date` (`YYYY-MM-DD`).
///
/// The `Tomador` block is present only when `taker` resolves to a taker
/// identity; see [`TakerFilter::taker_id`].
pub fn build_period_query(
    identity: &ProviderIdentity,
    start_date: &str,
    end_date: &str,
    taker: Option<&TakerFilter>,
) -> Result<String, NfseError> {
    let descriptor = Operation::QueryInvoicesByPeriod.descriptor();
    let mut root = Element::new(descriptor.root_element)
        .with_default_namespace(descriptor.namespace)
        .with_namespace("tipos", TYPES_NAMESPACE)
        .with_child(provider_block(identity))
        .with_child(
            Element::new("PeriodoEmissao")
                .with_child(Element::text("DataInicial", start_date))
                .with_child(Element::text("DataFinal", end_date)),
        );

    if let Some(filter) = taker {
        if let Some(id) = filter.taker_id() {
            let cpf_cnpj = match id {
                TakerId::Cnpj(cnpj) => Element::text("Cnpj", cnpj),
                TakerId::Cpf(cpf) => Element::text("Cpf", cpf),
            };
            let mut tomador = Element::new("Tomador").with_child(Element::new("CpfCnpj").with_child(cpf_cnpj));
            if let Some(im) = filter.effective_municipal_registration() {
                tomador.push_child(Element::text("InscricaoMunicipal", im));
            }
            root.push_child(tomador);
        }
    }

    render(root)
}

/// Build the `ConsultarNfseRpsEnvio` document.
pub fn build_rps_query(identity: &ProviderIdentity, rps: &RpsIdentification) -> Result<String, NfseError> {
    let descriptor = Operation::QueryInvoiceByRps.descriptor();
    render(
        Element::new(descriptor.root_element)
            .with_default_namespace(descriptor.namespace)
            .with_namespace("tipos", TYPES_NAMESPACE)
            .with_child(
                Element::new("IdentificacaoRps")
                    .with_child(Element::text("tipos:Numero", rps.number.as_str()))
                    .with_child(Element::text("tipos:Serie", rps.series.as_str()))
                    .with_child(Element::text("tipos:Tipo", rps.rps_type.to_string())),
            )
            .with_child(provider_block(identity)),
    )
}

/// Build the `CancelarNfseEnvio` document for invoice `nfse_number`.
///
/// `id` is the `InfPedidoCancelamento` reference id and defaults to the
/// invoice number.
pub fn build_cancellation(
    identity: &ProviderIdentity,
    nfse_number: &str,
    code: CancellationCode,
    id: Option<&str>,
) -> Result<String, NfseError> {
    let descriptor = Operation::CancelInvoice.descriptor();
    let id = id.filter(|v| !v.is_empty()).unwrap_or(nfse_number);

    let request = Element::new("p1:InfPedidoCancelamento")
        .with_attribute("Id", id)
        .with_child(
            Element::new("p1:IdentificacaoNfse")
                .with_child(Element::text("p1:Numero", nfse_number))
                .with_child(Element::text("p1:Cnpj", identity.tax_id()))
                .with_child(Element::text(
                    "p1:InscricaoMunicipal",
                    identity.municipal_registration(),
                ))
                .with_child(Element::text("p1:CodigoMunicipio", identity.municipal_code())),
        )
        .with_child(Element::text("p1:CodigoCancelamento", code.to_string()));

    render(
        Element::new(format!("p:{}", descriptor.root_element))
            .with_namespace("p", descriptor.namespace)
            .with_namespace("p1", TYPES_NAMESPACE)
            .with_child(Element::new("Pedido").with_child(request)),
    )
}

//! Request documents as the client emits them, checked against the built-in
//! structural models.

use nfse_core::Operation;
use nfse_schema::{SchemaSet, SchemaValidationError, SchemaValidator, StructuralValidator};

const TIPOS: &str = "http://nfe.sjp.pr.gov.br/tipos_v03.xsd";

fn schemas() -> SchemaSet {
    SchemaSet::new(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/schemes"))
}

fn lot(rps_count: usize, declared: usize) -> String {
    let mut xml = format!(
        concat!(
            r#"<EnviarLoteRpsEnvio xmlns="http://nfe.sjp.pr.gov.br/servico_enviar_lote_rps_envio_v03.xsd">"#,
            r#"<LoteRps Id="12" xmlns:tipos="{}">"#,
            "<tipos:NumeroLote>12</tipos:NumeroLote>",
            "<tipos:Cnpj>99999999000191</tipos:Cnpj>",
            "<tipos:InscricaoMunicipal>1733160024</tipos:InscricaoMunicipal>",
            "<tipos:QuantidadeRps>{}</tipos:QuantidadeRps>",
            "<tipos:ListaRps>"
        ),
        TIPOS, declared
    );
    for i in 0..rps_count {
        xml.push_str(&format!(
            r#"<tipos:Rps><tipos:InfRps Id="rps{i}"><tipos:Numero>{i}</tipos:Numero></tipos:InfRps></tipos:Rps>"#
        ));
    }
    xml.push_str("</tipos:ListaRps></LoteRps></EnviarLoteRpsEnvio>");
    xml
}

fn cancellation(code_municipio: &str) -> String {
    format!(
        concat!(
            r#"<p:CancelarNfseEnvio xmlns:p="http://nfe.sjp.pr.gov.br/servico_cancelar_nfse_envio_v03.xsd" xmlns:p1="{}">"#,
            "<Pedido>",
            r#"<p1:InfPedidoCancelamento Id="1001">"#,
            "<p1:IdentificacaoNfse>",
            "<p1:Numero>1001</p1:Numero>",
            "<p1:Cnpj>99999999000191</p1:Cnpj>",
            "<p1:InscricaoMunicipal>1733160024</p1:InscricaoMunicipal>",
            "<p1:CodigoMunicipio>{}</p1:CodigoMunicipio>",
            "</p1:IdentificacaoNfse>",
            "<p1:CodigoCancelamento>1</p1:CodigoCancelamento>",
            "</p1:InfPedidoCancelamento>",
            r#"<Signature xmlns="http://www.w3.org/2000/09/xmldsig#"/>"#,
            "</Pedido>",
            r#"<Signature xmlns="http://www.w3.org/2000/09/xmldsig#"/>"#,
            "</p:CancelarNfseEnvio>"
        ),
        TIPOS, code_municipio
    )
}

fn violation_count(result: Result<(), SchemaValidationError>) -> usize {
    match result {
        Ok(()) => 0,
        Err(SchemaValidationError::ValidationFailed { violations, .. }) => violations.len(),
        Err(other) => panic!("unexpected error: {other}"),
    }
}

#[test]
fn lot_with_one_and_fifty_rps_is_valid() {
    let path = schemas().path_for(Operation::SubmitLot);
    let v = StructuralValidator::new();
    v.validate(&lot(1, 1), &path).unwrap();
    v.validate(&lot(50, 50), &path).unwrap();
}

#[test]
fn lot_outside_rps_bounds_is_invalid() {
    let path = schemas().path_for(Operation::SubmitLot);
    let v = StructuralValidator::new();
    assert!(!v.is_valid(&lot(0, 0), &path));
    assert!(!v.is_valid(&lot(51, 51), &path));
}

#[test]
fn lot_without_id_is_invalid() {
    let path = schemas().path_for(Operation::SubmitLot);
    let xml = lot(1, 1).replace(r#" Id="12""#, "");
    assert_eq!(violation_count(StructuralValidator::new().validate(&xml, &path)), 1);
}

#[test]
fn signed_cancellation_is_valid() {
    let path = schemas().path_for(Operation::CancelInvoice);
    StructuralValidator::new()
        .validate(&cancellation("4125506"), &path)
        .unwrap();
}

#[test]
fn cancellation_with_short_municipal_code_is_invalid() {
    let path = schemas().path_for(Operation::CancelInvoice);
    assert_eq!(
        violation_count(StructuralValidator::new().validate(&cancellation("412550"), &path)),
        1
    );
}

#[test]
fn rps_query_checks_type_range() {
    let path = schemas().path_for(Operation::QueryInvoiceByRps);
    let doc = |tipo: &str| {
        format!(
            concat!(
                r#"<ConsultarNfseRpsEnvio xmlns="http://nfe.sjp.pr.gov.br/servico_consultar_nfse_rps_envio_v03.xsd" xmlns:tipos="{}">"#,
                "<IdentificacaoRps><tipos:Numero>10</tipos:Numero><tipos:Serie>A</tipos:Serie>",
                "<tipos:Tipo>{}</tipos:Tipo></IdentificacaoRps>",
                "<Prestador><tipos:Cnpj>99999999000191</tipos:Cnpj>",
                "<tipos:InscricaoMunicipal>1733160024</tipos:InscricaoMunicipal></Prestador>",
                "</ConsultarNfseRpsEnvio>"
            ),
            TIPOS, tipo
        )
    };
    let v = StructuralValidator::new();
    assert!(v.is_valid(&doc("1"), &path));
    assert!(!v.is_valid(&doc("9"), &path));
}

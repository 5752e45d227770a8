//! # SOAP over HTTP Transport
//!
//! [`SoapHttpTransport`] wraps a `reqwest::Client` bound to one resolved
//! municipality endpoint. Each call wraps the payload in a SOAP 1.1
//! envelope whose body holds a `ws:<WireName>` element in the endpoint's
//! namespace, and posts it with a `SOAPAction` header.
//!
//! ## Error Handling
//!
//! - Request timeouts map to [`TransportError::Timeout`].
//! - Connection failures map to [`TransportError::Unreachable`].
//! - Any non-2xx status maps to [`TransportError::Fault`] carrying the raw
//!   body (SOAP 1.1 faults arrive as HTTP 500).
//!
//! Retries are NOT built in.
//!
//! ## Runtime
//!
//! [`Transport::send`] is synchronous and drives the request with
//! `Handle::block_on` on the current Tokio runtime. Call it from a blocking
//! context (`tokio::task::spawn_blocking`), never from inside an async task.

use std::time::Duration;

use nfse_core::{EndpointCatalog, NfseConfig, NfseError, Operation, ResolvedEndpoint, TransportError};
use nfse_xml::Element;

use crate::transport::Transport;

const SOAP_ENVELOPE_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Configuration for [`SoapHttpTransport`].
#[derive(Debug, Clone)]
pub struct SoapTransportConfig {
    /// Endpoint selected for the provider's municipality and environment.
    pub endpoint: ResolvedEndpoint,
    /// Request timeout in seconds (default: 30).
    pub timeout_secs: u64,
}

impl SoapTransportConfig {
    /// Create a configuration with the default timeout.
    pub fn new(endpoint: ResolvedEndpoint) -> Self {
        Self {
            endpoint,
            timeout_secs: 30,
        }
    }
}

/// HTTP client for the authority's SOAP web service.
#[derive(Debug)]
pub struct SoapHttpTransport {
    client: reqwest::Client,
    url: url::Url,
    namespace: String,
    timeout_secs: u64,
}

impl SoapHttpTransport {
    /// Create a transport from configuration.
    pub fn new(config: SoapTransportConfig) -> Result<Self, TransportError> {
        let url = url::Url::parse(&config.endpoint.url).map_err(|e| {
            TransportError::NotConfigured(format!("invalid endpoint URL '{}': {e}", config.endpoint.url))
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TransportError::NotConfigured(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url,
            namespace: config.endpoint.namespace,
            timeout_secs: config.timeout_secs,
        })
    }

    /// Create a transport for the provider described by `config`, resolving
    /// its endpoint in `catalog`.
    pub fn from_config(config: &NfseConfig, catalog: &EndpointCatalog) -> Result<Self, NfseError> {
        let identity = config.identity()?;
        let endpoint = catalog.resolve(identity.municipal_code(), identity.environment())?;
        let mut transport_config = SoapTransportConfig::new(endpoint);
        transport_config.timeout_secs = config.timeout_secs;
        Ok(Self::new(transport_config)?)
    }

    /// Endpoint URL requests are posted to.
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Wrap `payload` in the SOAP envelope for `operation`.
    pub fn envelope(&self, payload: &str, operation: Operation) -> Result<String, TransportError> {
        let wire_name = operation.descriptor().wire_name;
        Element::new("soapenv:Envelope")
            .with_namespace("soapenv", SOAP_ENVELOPE_NAMESPACE)
            .with_namespace("ws", self.namespace.as_str())
            .with_child(Element::new("soapenv:Header"))
            .with_child(
                Element::new("soapenv:Body")
                    .with_child(Element::new(format!("ws:{wire_name}")).with_fragment(payload)),
            )
            .to_xml()
            .map_err(|e| TransportError::NotConfigured(format!("cannot build SOAP envelope: {e}")))
    }

    fn soap_action(&self, operation: Operation) -> String {
        format!("{}#{}", self.namespace, operation.descriptor().wire_name)
    }

    async fn post(&self, envelope: String, operation: Operation) -> Result<String, TransportError> {
        let wire_name = operation.descriptor().wire_name;
        let resp = self
            .client
            .post(self.url.clone())
            .header(reqwest::header::CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", self.soap_action(operation))
            .body(envelope)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout {
                        operation: wire_name.to_string(),
                        elapsed_ms: self.timeout_secs * 1000,
                    }
                } else {
                    TransportError::Unreachable {
                        operation: wire_name.to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| TransportError::Unreachable {
            operation: wire_name.to_string(),
            reason: format!("failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            return Err(TransportError::Fault {
                operation: wire_name.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

impl Transport for SoapHttpTransport {
    fn send(&self, payload: &str, operation: Operation) -> Result<String, TransportError> {
        let rt = tokio::runtime::Handle::try_current().map_err(|_| {
            TransportError::NotConfigured("no async runtime available for HTTP request".into())
        })?;
        let envelope = self.envelope(payload, operation)?;

        tracing::debug!(
            operation = %operation,
            url = %self.url,
            bytes = envelope.len(),
            "posting SOAP request"
        );
        rt.block_on(self.post(envelope, operation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(url: &str) -> ResolvedEndpoint {
        ResolvedEndpoint {
            url: url.to_string(),
            namespace: "urn:ws".to_string(),
            version: "3".to_string(),
        }
    }

    #[test]
    fn invalid_url_is_rejected() {
        let err = SoapHttpTransport::new(SoapTransportConfig::new(endpoint("not a url"))).unwrap_err();
        assert!(matches!(err, TransportError::NotConfigured(_)));
    }

    #[test]
    fn envelope_wraps_payload_in_wire_operation() {
        let transport = SoapHttpTransport::new(SoapTransportConfig::new(endpoint("https://ws.example/index.php")))
            .unwrap();
        let envelope = transport.envelope("<ConsultarLoteRpsEnvio/>", Operation::RetrieveLot).unwrap();
        assert_eq!(
            envelope,
            concat!(
                r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:ws="urn:ws">"#,
                "<soapenv:Header/><soapenv:Body><ws:ConsultarLoteRpsV3><ConsultarLoteRpsEnvio/></ws:ConsultarLoteRpsV3>",
                "</soapenv:Body></soapenv:Envelope>"
            )
        );
        assert_eq!(transport.soap_action(Operation::RetrieveLot), "urn:ws#ConsultarLoteRpsV3");
    }

    #[test]
    fn send_outside_runtime_is_not_configured() {
        let transport = SoapHttpTransport::new(SoapTransportConfig::new(endpoint("https://ws.example/")))
            .unwrap();
        assert!(matches!(
            transport.send("<a/>", Operation::RetrieveLot),
            Err(TransportError::NotConfigured(_))
        ));
    }
}

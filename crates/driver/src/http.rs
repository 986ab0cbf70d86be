// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # HTTP transport
//!
//! Posts SOAP 1.1 envelopes to the provider endpoint. Providers commonly
//! answer a fault with HTTP 500 and a SOAP body; such bodies are returned as
//! they are so the codec can surface the fault text.

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use tracing::debug;
use xmla_olap_metadata::{SoapAction, Transport};
use xmla_olap_protocol::{XmlaError, XmlaResult};

use crate::config::{ConfigError, XmlaConfig};

const SOAP_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// [`Transport`] over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: reqwest::Url,
    credentials: Option<(String, Option<String>)>,
}

impl HttpTransport {
    pub fn new(config: &XmlaConfig) -> XmlaResult<Self> {
        let url = reqwest::Url::parse(&config.server_url).map_err(|e| ConfigError::InvalidServerUrl {
            url: config.server_url.clone(),
            reason: e.to_string(),
        })?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| XmlaError::transport("failed to build HTTP client", e))?;
        Ok(Self {
            client,
            url,
            credentials: config
                .user
                .clone()
                .map(|user| (user, config.password.clone())),
        })
    }

    pub fn url(&self) -> &reqwest::Url {
        &self.url
    }
}

/// Whether a body looks like a SOAP envelope rather than an HTML error page
fn is_soap_envelope(body: &[u8]) -> bool {
    let head = &body[..body.len().min(512)];
    String::from_utf8_lossy(head).contains("Envelope")
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: String, action: SoapAction) -> XmlaResult<Vec<u8>> {
        let mut builder = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static(SOAP_CONTENT_TYPE))
            .header("SOAPAction", action.header_value())
            .body(request);
        if let Some((user, password)) = &self.credentials {
            builder = builder.basic_auth(user, password.as_deref());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| XmlaError::transport(format!("POST {} failed", self.url), e))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| XmlaError::transport("failed to read response body", e))?;
        debug!(status = %status, bytes = body.len(), "XMLA response received");

        if status.is_success() || is_soap_envelope(&body) {
            Ok(body.to_vec())
        } else {
            Err(XmlaError::Transport {
                message: format!("server returned HTTP {} for {}", status, self.url),
                source: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_soap_body() {
        assert!(is_soap_envelope(b"<SOAP-ENV:Envelope xmlns:SOAP-ENV=\"x\"/>"));
        assert!(!is_soap_envelope(b"<html><body>502 Bad Gateway</body></html>"));
    }

    #[test]
    fn test_rejects_unparseable_url() {
        let err = HttpTransport::new(&XmlaConfig::new("http://")).unwrap_err();
        assert!(matches!(err, XmlaError::Configuration(_)));
    }

    #[test]
    fn test_keeps_credentials() {
        let transport =
            HttpTransport::new(&XmlaConfig::new("http://localhost/xmla").with_credentials("u", "p"))
                .unwrap();
        assert_eq!(transport.url().path(), "/xmla");
        assert_eq!(transport.credentials, Some(("u".to_string(), Some("p".to_string()))));
    }
}

//! SOAP over HTTP with reqwest

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use tracing::trace;

use crate::application::ports::SoapTransport;
use crate::support::errors::TransportError;

const SOAP_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// POSTs envelopes to one clearing-house endpoint.
pub struct HttpSoapTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSoapTransport {
    pub fn new(endpoint: impl Into<String>, connect_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!("ochp-bridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// SOAP 1.1 delivers faults with HTTP 500; those bodies go to the envelope
/// parser so the fault code and reason survive.
fn carries_fault(status: StatusCode, content_type: Option<&HeaderValue>) -> bool {
    status == StatusCode::INTERNAL_SERVER_ERROR
        && content_type
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("xml"))
}

#[async_trait]
impl SoapTransport for HttpSoapTransport {
    async fn send(&self, soap_action: &str, envelope: String) -> Result<String, TransportError> {
        trace!(endpoint = %self.endpoint, soap_action, "POST envelope");
        let resp = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .header("SOAPAction", format!("\"{soap_action}\""))
            .body(envelope)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        let status = resp.status();
        let fault = carries_fault(status, resp.headers().get(CONTENT_TYPE));
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        if status.is_success() || fault {
            Ok(body)
        } else {
            Err(TransportError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

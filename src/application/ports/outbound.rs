//! Outbound ports — interfaces for reaching the remote clearing house
//!
//! [`SoapTransport`] decouples the synchronization engine from the concrete
//! HTTP stack. The production implementation lives in
//! [`HttpSoapTransport`](crate::infrastructure::transport::HttpSoapTransport).

use std::sync::Arc;

use async_trait::async_trait;

use crate::support::errors::TransportError;

/// Delivers one serialized SOAP envelope and returns the raw response text.
///
/// Implementations do not retry and do not enforce a deadline; the caller
/// wraps `send` in its own timeout and cancellation.
#[async_trait]
pub trait SoapTransport: Send + Sync {
    async fn send(&self, soap_action: &str, envelope: String) -> Result<String, TransportError>;
}

pub type SharedSoapTransport = Arc<dyn SoapTransport>;

//! Typed request/response calls over a [`SoapTransport`]

use std::fmt;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::application::ports::SharedSoapTransport;
use crate::protocol::{decode_message, EnvelopeBuilder, OchpOperation};
use crate::support::errors::ClientError;
use crate::support::shutdown::ShutdownSignal;

/// Username and password for the WS-Security header
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

pub struct OchpClient {
    transport: SharedSoapTransport,
    credentials: Option<Credentials>,
}

impl OchpClient {
    pub fn new(transport: SharedSoapTransport) -> Self {
        Self {
            transport,
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Send one request and decode the matching response.
    ///
    /// The transport call is the only suspension point; it is abandoned on
    /// `timeout` or when `shutdown` fires.
    pub async fn call<Op: OchpOperation>(
        &self,
        request: &Op,
        timeout: Duration,
        shutdown: &ShutdownSignal,
    ) -> Result<Op::Response, ClientError> {
        let mut builder = EnvelopeBuilder::new().message(request)?;
        if let Some(credentials) = &self.credentials {
            builder = builder.credentials(&credentials.username, &credentials.password);
        }
        let envelope = builder.build()?.to_xml()?;
        let action = Op::soap_action();

        let started = Instant::now();
        let sent = tokio::select! {
            result = tokio::time::timeout(timeout, self.transport.send(&action, envelope)) => {
                match result {
                    Ok(response) => response.map_err(ClientError::from),
                    Err(_) => Err(ClientError::Timeout(timeout)),
                }
            }
            _ = shutdown.notified().wait() => Err(ClientError::Cancelled),
        };
        let decoded = sent.and_then(|text| {
            decode_message::<Op::Response>(&text).map_err(ClientError::from)
        });

        let outcome = match &decoded {
            Ok(_) => "ok",
            Err(ClientError::Timeout(_)) => "timeout",
            Err(ClientError::Cancelled) => "cancelled",
            Err(ClientError::Transport(_)) => "transport_error",
            Err(_) => "malformed",
        };
        metrics::counter!("ochp_remote_calls_total", "operation" => Op::NAME, "outcome" => outcome)
            .increment(1);
        debug!(
            operation = Op::NAME,
            outcome,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Remote call finished"
        );

        decoded
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::application::sync::testing::ScriptedTransport;
    use crate::protocol::messages::{GetChargePointListRequest, GetChargePointListResponse};
    use crate::protocol::OchpResponse;
    use crate::protocol::SoapEnvelope;
    use crate::support::errors::{EnvelopeError, TransportError};

    #[tokio::test]
    async fn call_sends_signed_envelope_and_decodes_response() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(&GetChargePointListResponse::ok());
        let client = OchpClient::new(transport.clone())
            .with_credentials(Some(Credentials::new("partner", "secret")));

        let response = client
            .call(
                &GetChargePointListRequest,
                Duration::from_secs(5),
                &ShutdownSignal::new(),
            )
            .await
            .unwrap();
        assert!(response.items.is_empty());

        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "http://ochp.eu/1.4/GetChargePointList");
        let envelope = SoapEnvelope::parse(&sent[0].1).unwrap();
        let token = envelope.security().unwrap();
        assert_eq!(token.username, "partner");
        assert!(token.verify("secret"));
    }

    #[tokio::test]
    async fn transport_failure_is_reported() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.fail(TransportError::Status {
            status: 503,
            body: "busy".into(),
        });
        let client = OchpClient::new(transport);

        let err = client
            .call(
                &GetChargePointListRequest,
                Duration::from_secs(5),
                &ShutdownSignal::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Transport(TransportError::Status { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn malformed_response_is_an_envelope_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond_raw("<notSoap/>");
        let client = OchpClient::new(transport);

        let err = client
            .call(
                &GetChargePointListRequest,
                Duration::from_secs(5),
                &ShutdownSignal::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Envelope(EnvelopeError::NotAnEnvelope(_))));
    }

    #[tokio::test]
    async fn hung_transport_times_out() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.hang();
        let client = OchpClient::new(transport);

        let err = client
            .call(
                &GetChargePointListRequest,
                Duration::from_millis(20),
                &ShutdownSignal::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Timeout(d) if d == Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn shutdown_cancels_in_flight_call() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.hang();
        let client = OchpClient::new(transport);
        let shutdown = ShutdownSignal::new();
        shutdown.trigger();

        let err = client
            .call(&GetChargePointListRequest, Duration::from_secs(30), &shutdown)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Cancelled));
    }
}

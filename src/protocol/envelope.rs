//! SOAP 1.1 envelopes with an optional WS-Security UsernameToken header
//!
//! The security header carries the username in clear text and a digest
//! computed as `base64(sha1(nonce + created + password))` over the raw
//! strings. The nonce is emitted base64-encoded in its own element.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{SecondsFormat, Utc};
use sha1::{Digest, Sha1};
use uuid::Uuid;

use super::codec::OchpMessage;
use super::namespaces::{
    BASE64_BINARY_ENCODING, OCHP, PASSWORD_TEXT_TYPE, SOAP_ENVELOPE, WSSE, WSU,
};
use super::xml::{XElement, XName};
use crate::support::errors::{CodecError, EnvelopeError};

/// Characters of the random identifier kept as nonce
const NONCE_LEN: usize = 16;

/// `base64(sha1(nonce || created || password))`
pub fn password_digest(nonce: &str, created: &str, password: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(nonce.as_bytes());
    hasher.update(created.as_bytes());
    hasher.update(password.as_bytes());
    BASE64.encode(hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsernameToken {
    pub username: String,
    /// Digest as sent on the wire
    pub password_digest: String,
    /// Raw nonce, before base64 encoding
    pub nonce: String,
    pub created: String,
}

impl UsernameToken {
    /// Fresh token with a random nonce and the current time.
    pub fn generate(username: &str, password: &str) -> Self {
        let nonce: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(NONCE_LEN)
            .collect();
        let created = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        Self::with_nonce(username, password, &nonce, &created)
    }

    pub fn with_nonce(username: &str, password: &str, nonce: &str, created: &str) -> Self {
        Self {
            username: username.to_string(),
            password_digest: password_digest(nonce, created, password),
            nonce: nonce.to_string(),
            created: created.to_string(),
        }
    }

    /// True when the digest was produced from `password`.
    pub fn verify(&self, password: &str) -> bool {
        password_digest(&self.nonce, &self.created, password) == self.password_digest
    }

    fn to_header(&self) -> XElement {
        let token = XElement::new(XName::new(WSSE, "UsernameToken"))
            .with_child(XElement::new(XName::new(WSSE, "Username")).with_text(self.username.clone()))
            .with_child(
                XElement::new(XName::new(WSSE, "Password"))
                    .with_attr("Type", PASSWORD_TEXT_TYPE)
                    .with_text(self.password_digest.clone()),
            )
            .with_child(
                XElement::new(XName::new(WSSE, "Nonce"))
                    .with_attr("EncodingType", BASE64_BINARY_ENCODING)
                    .with_text(BASE64.encode(self.nonce.as_bytes())),
            )
            .with_child(XElement::new(XName::new(WSU, "Created")).with_text(self.created.clone()));

        XElement::new(XName::new(SOAP_ENVELOPE, "Header"))
            .with_child(XElement::new(XName::new(WSSE, "Security")).with_child(token))
    }

    fn from_header(header: &XElement) -> Result<Option<Self>, EnvelopeError> {
        let token = match header
            .child(&XName::new(WSSE, "Security"))
            .and_then(|security| security.child(&XName::new(WSSE, "UsernameToken")))
        {
            Some(token) => token,
            None => return Ok(None),
        };

        let text = |ns: &str, local: &str| {
            token
                .child(&XName::new(ns, local))
                .map(|el| el.text().trim().to_string())
                .filter(|t| !t.is_empty())
        };

        let username = text(WSSE, "Username").ok_or(EnvelopeError::MissingUsername)?;
        let password_digest = text(WSSE, "Password").ok_or(EnvelopeError::MissingPassword)?;
        let encoded_nonce = text(WSSE, "Nonce").ok_or_else(|| CodecError::MissingField {
            field: "Nonce",
            fragment: token.fragment(),
        })?;
        let nonce = BASE64
            .decode(encoded_nonce.as_bytes())
            .ok()
            .and_then(|raw| String::from_utf8(raw).ok())
            .ok_or_else(|| CodecError::InvalidField {
                field: "Nonce",
                reason: "not base64-encoded text".into(),
                fragment: token.fragment(),
            })?;
        let created = text(WSU, "Created").ok_or_else(|| CodecError::MissingField {
            field: "Created",
            fragment: token.fragment(),
        })?;

        Ok(Some(Self {
            username,
            password_digest,
            nonce,
            created,
        }))
    }
}

/// A body element, optionally preceded by a security header.
#[derive(Debug, Clone, PartialEq)]
pub struct SoapEnvelope {
    security: Option<UsernameToken>,
    body: XElement,
}

impl SoapEnvelope {
    pub fn plain(body: XElement) -> Self {
        Self {
            security: None,
            body,
        }
    }

    pub fn body(&self) -> &XElement {
        &self.body
    }

    pub fn security(&self) -> Option<&UsernameToken> {
        self.security.as_ref()
    }

    pub fn into_body(self) -> XElement {
        self.body
    }

    pub fn to_element(&self) -> XElement {
        XElement::new(XName::new(SOAP_ENVELOPE, "Envelope"))
            .with_opt_child(self.security.as_ref().map(UsernameToken::to_header))
            .with_child(XElement::new(XName::new(SOAP_ENVELOPE, "Body")).with_child(self.body.clone()))
    }

    /// Serialized envelope. The envelope and OCHP namespaces are always
    /// declared on the root, the direct namespace only when used.
    pub fn to_xml(&self) -> Result<String, CodecError> {
        self.to_element().to_xml_string_with(&[OCHP])
    }

    /// Read an envelope, surfacing a SOAP fault as [`EnvelopeError::Fault`].
    pub fn parse(text: &str) -> Result<Self, EnvelopeError> {
        let root = XElement::parse_str(text)?;
        if !root.name.is(SOAP_ENVELOPE, "Envelope") {
            return Err(EnvelopeError::NotAnEnvelope(root.name.to_string()));
        }

        let security = match root.child(&XName::new(SOAP_ENVELOPE, "Header")) {
            Some(header) => UsernameToken::from_header(header)?,
            None => None,
        };

        let body = root
            .child(&XName::new(SOAP_ENVELOPE, "Body"))
            .and_then(|body| body.children.first())
            .ok_or(EnvelopeError::EmptyBody)?;

        if body.name.is(SOAP_ENVELOPE, "Fault") {
            return Err(fault(body));
        }

        Ok(Self {
            security,
            body: body.clone(),
        })
    }
}

/// SOAP 1.1 fault children are unqualified.
fn fault(element: &XElement) -> EnvelopeError {
    let text = |local: &str| {
        element
            .child(&XName::unqualified(local))
            .map(|el| el.text().trim().to_string())
            .unwrap_or_default()
    };
    EnvelopeError::Fault {
        code: text("faultcode"),
        reason: text("faultstring"),
    }
}

/// Decode a response document into its typed body message.
pub fn decode_message<M: OchpMessage>(text: &str) -> Result<M, EnvelopeError> {
    let envelope = SoapEnvelope::parse(text)?;
    Ok(M::parse(envelope.body())?)
}

/// Builds outgoing envelopes; every precondition is checked in
/// [`EnvelopeBuilder::build`].
#[derive(Debug, Default)]
pub struct EnvelopeBuilder {
    body: Option<XElement>,
    credentials: Option<(String, String)>,
    nonce: Option<(String, String)>,
}

impl EnvelopeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(mut self, body: XElement) -> Self {
        self.body = Some(body);
        self
    }

    /// Validate and encode a message as the body.
    pub fn message<M: OchpMessage>(self, message: &M) -> Result<Self, EnvelopeError> {
        message.validate()?;
        Ok(self.body(message.to_wire()))
    }

    /// Request a UsernameToken header. Blank values are rejected by `build`.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Fixed nonce and creation time instead of fresh ones.
    pub fn nonce(mut self, nonce: impl Into<String>, created: impl Into<String>) -> Self {
        self.nonce = Some((nonce.into(), created.into()));
        self
    }

    pub fn build(self) -> Result<SoapEnvelope, EnvelopeError> {
        let body = self.body.ok_or(EnvelopeError::MissingBody)?;

        let security = match self.credentials {
            Some((username, password)) => {
                if username.trim().is_empty() {
                    return Err(EnvelopeError::MissingUsername);
                }
                if password.is_empty() {
                    return Err(EnvelopeError::MissingPassword);
                }
                Some(match self.nonce {
                    Some((nonce, created)) => {
                        UsernameToken::with_nonce(&username, &password, &nonce, &created)
                    }
                    None => UsernameToken::generate(&username, &password),
                })
            }
            None => None,
        };

        Ok(SoapEnvelope { security, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONCE: &str = "0123456789abcdef";
    const CREATED: &str = "2021-01-01T00:00:00.000Z";

    fn body() -> XElement {
        XElement::new(XName::ochp("GetChargePointListRequest"))
    }

    #[test]
    fn digest_matches_reference_vector() {
        assert_eq!(
            password_digest(NONCE, CREATED, "secret"),
            "F8oa1RC+6KDq2/XRipzXwucBOyM="
        );
    }

    #[test]
    fn plain_envelope_declares_both_namespaces() {
        let xml = EnvelopeBuilder::new().body(body()).build().unwrap().to_xml().unwrap();
        assert_eq!(
            xml,
            concat!(
                r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:ns="http://ochp.eu/1.4">"#,
                r#"<soapenv:Body><ns:GetChargePointListRequest/></soapenv:Body>"#,
                r#"</soapenv:Envelope>"#
            )
        );
    }

    #[test]
    fn authenticated_envelope_carries_token() {
        let envelope = EnvelopeBuilder::new()
            .body(body())
            .credentials("user", "secret")
            .nonce(NONCE, CREATED)
            .build()
            .unwrap();
        let xml = envelope.to_xml().unwrap();

        assert!(xml.contains("<wsse:Username>user</wsse:Username>"));
        assert!(xml.contains("F8oa1RC+6KDq2/XRipzXwucBOyM=</wsse:Password>"));
        assert!(xml.contains(">MDEyMzQ1Njc4OWFiY2RlZg==</wsse:Nonce>"));
        assert!(xml.contains("<wsu:Created>2021-01-01T00:00:00.000Z</wsu:Created>"));
        assert!(xml.contains(PASSWORD_TEXT_TYPE));
        assert!(xml.contains(BASE64_BINARY_ENCODING));
        assert!(!xml.contains("secret<"));

        let parsed = SoapEnvelope::parse(&xml).unwrap();
        assert_eq!(parsed, envelope);
        assert!(parsed.security().unwrap().verify("secret"));
        assert!(!parsed.security().unwrap().verify("wrong"));
    }

    #[test]
    fn generated_nonce_is_sixteen_chars() {
        let token = UsernameToken::generate("user", "secret");
        assert_eq!(token.nonce.len(), 16);
        assert!(token.created.ends_with('Z'));
        assert!(token.verify("secret"));
    }

    #[test]
    fn preconditions_fail_fast() {
        assert!(matches!(
            EnvelopeBuilder::new().build(),
            Err(EnvelopeError::MissingBody)
        ));
        assert!(matches!(
            EnvelopeBuilder::new().body(body()).credentials("", "pw").build(),
            Err(EnvelopeError::MissingUsername)
        ));
        assert!(matches!(
            EnvelopeBuilder::new().body(body()).credentials("user", "").build(),
            Err(EnvelopeError::MissingPassword)
        ));
    }

    #[test]
    fn faults_and_foreign_documents_are_errors() {
        let fault = r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"><soapenv:Body><soapenv:Fault><faultcode>soapenv:Server</faultcode><faultstring>boom</faultstring></soapenv:Fault></soapenv:Body></soapenv:Envelope>"#;
        match SoapEnvelope::parse(fault) {
            Err(EnvelopeError::Fault { code, reason }) => {
                assert_eq!(code, "soapenv:Server");
                assert_eq!(reason, "boom");
            }
            other => panic!("expected fault, got {other:?}"),
        }

        assert!(matches!(
            SoapEnvelope::parse(r#"<a xmlns="urn:x"/>"#),
            Err(EnvelopeError::NotAnEnvelope(_))
        ));
        assert!(matches!(
            SoapEnvelope::parse(r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"><soapenv:Body/></soapenv:Envelope>"#),
            Err(EnvelopeError::EmptyBody)
        ));
    }
}

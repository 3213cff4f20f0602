use std::time::Duration;

use thiserror::Error;

use crate::protocol::OchpResult;

/// Longest raw XML fragment carried inside a codec error.
const MAX_FRAGMENT_LEN: usize = 512;

/// Errors raised while turning XML into typed protocol values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("Malformed XML: {0}")]
    Xml(String),

    #[error("Unexpected element: expected {expected}, found {found}")]
    UnexpectedElement { expected: String, found: String },

    #[error("Missing mandatory field '{field}' in {fragment}")]
    MissingField {
        field: &'static str,
        fragment: String,
    },

    #[error("Invalid value for '{field}' ({reason}) in {fragment}")]
    InvalidField {
        field: &'static str,
        reason: String,
        fragment: String,
    },
}

impl CodecError {
    /// Name of the offending field, if the error is tied to one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::MissingField { field, .. } | Self::InvalidField { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Shortens a raw XML fragment so errors stay readable in logs.
pub(crate) fn truncate_fragment(mut fragment: String) -> String {
    if fragment.len() > MAX_FRAGMENT_LEN {
        let mut cut = MAX_FRAGMENT_LEN;
        while !fragment.is_char_boundary(cut) {
            cut -= 1;
        }
        fragment.truncate(cut);
        fragment.push_str("...");
    }
    fragment
}

/// Precondition violations while constructing a value locally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing mandatory field: {0}")]
    Missing(&'static str),

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("Envelope has no body")]
    MissingBody,

    #[error("Security header requires a username")]
    MissingUsername,

    #[error("Security header requires a password")]
    MissingPassword,

    #[error("Document is not a SOAP envelope: root element is {0}")]
    NotAnEnvelope(String),

    #[error("SOAP body is empty")]
    EmptyBody,

    #[error("SOAP fault {code}: {reason}")]
    Fault { code: String, reason: String },

    #[error("Message cannot be sent: {0}")]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Remote answered with HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Remote call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Remote call cancelled")]
    Cancelled,
}

/// Errors raised by the local entity hierarchy.
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    #[error("Not found: {entity} {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Already exists: {entity} {id}")]
    Conflict { entity: &'static str, id: String },

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for operations on the local entity hierarchy
pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{operation} failed: {source}")]
    Fetch {
        operation: &'static str,
        #[source]
        source: ClientError,
    },

    #[error("{operation} rejected by remote: {result}")]
    Rejected {
        operation: &'static str,
        result: OchpResult,
    },

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl SyncError {
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Fetch {
                source: ClientError::Timeout(_),
                ..
            }
        )
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

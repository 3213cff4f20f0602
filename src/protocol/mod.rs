//! OCHP 1.4 wire protocol: XML model, message codec, SOAP envelopes and
//! the translation to the local vocabulary.

pub mod codec;
pub mod envelope;
pub mod mapping;
pub mod messages;
pub mod namespaces;
pub mod result;
pub mod types;
pub mod xml;

pub use codec::{FieldReader, OchpMessage, OchpResponse, WireRecord};
pub use envelope::{decode_message, password_digest, EnvelopeBuilder, SoapEnvelope, UsernameToken};
pub use messages::OchpOperation;
pub use result::{OchpResult, ResultCode};
pub use xml::{XElement, XName};

//! Result taxonomy attached to every OCHP response

use std::fmt;

use super::codec::{wire_enum, FieldReader, WireRecord};
use super::xml::{XElement, XName};
use crate::support::errors::CodecError;

wire_enum! {
    /// Outcome code of a remote operation
    pub enum ResultCode {
        Ok => "ok",
        Partly => "partly",
        NotAuthorized => "not-authorized",
        InvalidId => "invalid-id",
        Server => "server",
        Format => "format",
    }
}

/// Outcome code plus optional human-readable description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OchpResult {
    pub code: ResultCode,
    pub description: Option<String>,
}

impl OchpResult {
    pub fn new(code: ResultCode, description: Option<String>) -> Self {
        Self { code, description }
    }

    pub fn ok() -> Self {
        Self::new(ResultCode::Ok, None)
    }

    pub fn partly(description: impl Into<String>) -> Self {
        Self::new(ResultCode::Partly, Some(description.into()))
    }

    pub fn not_authorized(description: impl Into<String>) -> Self {
        Self::new(ResultCode::NotAuthorized, Some(description.into()))
    }

    pub fn invalid_id(description: impl Into<String>) -> Self {
        Self::new(ResultCode::InvalidId, Some(description.into()))
    }

    pub fn server(description: impl Into<String>) -> Self {
        Self::new(ResultCode::Server, Some(description.into()))
    }

    pub fn format(description: impl Into<String>) -> Self {
        Self::new(ResultCode::Format, Some(description.into()))
    }

    /// `ok` and `partly` carry usable payloads; everything else is a
    /// business-level failure.
    pub fn is_success(&self) -> bool {
        matches!(self.code, ResultCode::Ok | ResultCode::Partly)
    }

    /// Read the single `result` child of a response element.
    pub(crate) fn read_from_response(fields: &FieldReader<'_>) -> Result<Self, CodecError> {
        match fields.children("result").as_slice() {
            [single] => Self::read(single),
            [] => Err(fields.missing("result")),
            _ => Err(fields.invalid("result", "response carries more than one result")),
        }
    }
}

impl Default for OchpResult {
    fn default() -> Self {
        Self::ok()
    }
}

impl fmt::Display for OchpResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{} ({})", self.code, description),
            None => write!(f, "{}", self.code),
        }
    }
}

impl WireRecord for OchpResult {
    /// `<result><resultCode><resultCode>ok</resultCode></resultCode>
    /// <resultDescription>…</resultDescription></result>`
    fn read(fields: &FieldReader<'_>) -> Result<Self, CodecError> {
        let code = fields
            .required_child("resultCode")?
            .required::<ResultCode>("resultCode")?;
        let description = fields
            .optional_text("resultDescription")
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        Ok(Self { code, description })
    }

    fn write(&self, name: XName) -> XElement {
        let ns = name.namespace.clone().unwrap_or_default();
        XElement::new(name)
            .with_child(
                XElement::new(XName::new(&ns, "resultCode")).with_child(
                    XElement::new(XName::new(&ns, "resultCode")).with_text(self.code.as_wire()),
                ),
            )
            .with_opt_child(
                self.description
                    .as_ref()
                    .map(|d| XElement::new(XName::new(&ns, "resultDescription")).with_text(d.clone())),
            )
    }
}

//! Generic parse/serialize contract shared by every OCHP message
//!
//! A message type names its XML tag and namespace, decodes its body from an
//! [`XElement`] and encodes itself back. Equality is structural (derived),
//! so round-trips compare field by field.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};

use super::namespaces;
use super::result::OchpResult;
use super::xml::{XElement, XName};
use crate::support::errors::{CodecError, ValidationError};

pub trait OchpMessage: Sized + Clone + PartialEq + fmt::Debug {
    /// Root tag name
    const TAG: &'static str;
    /// Namespace of the root tag and its fields
    const NAMESPACE: &'static str = namespaces::OCHP;

    fn tag() -> XName {
        XName::new(Self::NAMESPACE, Self::TAG)
    }

    /// Decode the fields of an element already known to carry [`Self::TAG`].
    fn parse_body(fields: &FieldReader<'_>) -> Result<Self, CodecError>;

    fn to_wire(&self) -> XElement;

    /// Checks mandatory content a type cannot enforce on its own (non-empty
    /// strings, non-empty collections). Called before a message is sent.
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Validate the root tag and decode the message.
    fn parse(element: &XElement) -> Result<Self, CodecError> {
        let expected = Self::tag();
        if element.name != expected {
            return Err(CodecError::UnexpectedElement {
                expected: expected.to_string(),
                found: element.name.to_string(),
            });
        }
        Self::parse_body(&FieldReader::new(element, Self::NAMESPACE))
    }

    /// Load a full document and decode its root element.
    fn try_parse_text(text: &str) -> Result<Self, CodecError> {
        let root = XElement::parse_str(text)?;
        Self::parse(&root)
    }

    /// Empty element carrying this message's tag
    fn wire_root() -> XElement {
        XElement::new(Self::tag())
    }
}

/// Responses carry exactly one [`OchpResult`]; the helpers build a response
/// with an empty payload for each outcome so code and description stay
/// consistent.
pub trait OchpResponse: OchpMessage {
    fn from_result(result: OchpResult) -> Self;

    fn result(&self) -> &OchpResult;

    fn ok() -> Self {
        Self::from_result(OchpResult::ok())
    }

    fn partly(description: impl Into<String>) -> Self {
        Self::from_result(OchpResult::partly(description))
    }

    fn not_authorized(description: impl Into<String>) -> Self {
        Self::from_result(OchpResult::not_authorized(description))
    }

    fn invalid_id(description: impl Into<String>) -> Self {
        Self::from_result(OchpResult::invalid_id(description))
    }

    fn server(description: impl Into<String>) -> Self {
        Self::from_result(OchpResult::server(description))
    }

    fn format(description: impl Into<String>) -> Self {
        Self::from_result(OchpResult::format(description))
    }
}

/// A value type that appears as a nested element inside messages.
pub trait WireRecord: Sized {
    fn read(fields: &FieldReader<'_>) -> Result<Self, CodecError>;

    fn write(&self, name: XName) -> XElement;
}

/// Error returned when a wire token does not belong to a closed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownWireValue(pub String);

impl fmt::Display for UnknownWireValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value '{}'", self.0)
    }
}

/// Declares a closed wire vocabulary with `as_wire`, `FromStr` and `Display`.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_wire(&self) -> &'static str {
                match self {
                    $( $name::$variant => $wire ),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::protocol::codec::UnknownWireValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $wire => Ok($name::$variant), )+
                    other => Err($crate::protocol::codec::UnknownWireValue(other.to_string())),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_wire())
            }
        }
    };
}

pub(crate) use wire_enum;

// ── Field access ───────────────────────────────────────────────

/// Reads named fields of one element in a fixed namespace, producing
/// errors that name the field and carry the raw element.
pub struct FieldReader<'a> {
    element: &'a XElement,
    namespace: &'static str,
}

impl<'a> FieldReader<'a> {
    pub fn new(element: &'a XElement, namespace: &'static str) -> Self {
        Self { element, namespace }
    }

    pub fn element(&self) -> &'a XElement {
        self.element
    }

    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    fn name(&self, field: &str) -> XName {
        XName::new(self.namespace, field)
    }

    /// Reader for a nested element, same namespace.
    pub fn nested(&self, element: &'a XElement) -> FieldReader<'a> {
        FieldReader::new(element, self.namespace)
    }

    pub fn missing(&self, field: &'static str) -> CodecError {
        CodecError::MissingField {
            field,
            fragment: self.element.fragment(),
        }
    }

    pub fn invalid(&self, field: &'static str, reason: impl fmt::Display) -> CodecError {
        CodecError::InvalidField {
            field,
            reason: reason.to_string(),
            fragment: self.element.fragment(),
        }
    }

    // ── Child elements ─────────────────────────────────────

    pub fn optional_child(&self, field: &'static str) -> Option<FieldReader<'a>> {
        let name = self.name(field);
        self.element
            .children
            .iter()
            .find(|c| c.name == name)
            .map(|c| self.nested(c))
    }

    pub fn required_child(&self, field: &'static str) -> Result<FieldReader<'a>, CodecError> {
        self.optional_child(field)
            .ok_or_else(|| self.missing(field))
    }

    pub fn children(&self, field: &'static str) -> Vec<FieldReader<'a>> {
        let name = self.name(field);
        self.element
            .children
            .iter()
            .filter(|c| c.name == name)
            .map(|c| self.nested(c))
            .collect()
    }

    /// Decode every repetition of a record-valued field, in document order.
    pub fn records<T: WireRecord>(&self, field: &'static str) -> Result<Vec<T>, CodecError> {
        self.children(field).iter().map(T::read).collect()
    }

    /// Decode a repeated field that must occur at least once.
    pub fn required_records<T: WireRecord>(
        &self,
        field: &'static str,
    ) -> Result<Vec<T>, CodecError> {
        let records = self.records(field)?;
        if records.is_empty() {
            return Err(self.missing(field));
        }
        Ok(records)
    }

    pub fn optional_record<T: WireRecord>(
        &self,
        field: &'static str,
    ) -> Result<Option<T>, CodecError> {
        self.optional_child(field).map(|c| T::read(&c)).transpose()
    }

    pub fn required_record<T: WireRecord>(&self, field: &'static str) -> Result<T, CodecError> {
        T::read(&self.required_child(field)?)
    }

    // ── Text-valued children ───────────────────────────────

    pub fn optional_text(&self, field: &'static str) -> Option<&'a str> {
        let name = self.name(field);
        self.element
            .children
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.text())
    }

    /// Optional free text, trimmed; blank counts as absent.
    pub fn optional_string(&self, field: &'static str) -> Option<String> {
        self.optional_text(field)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }

    pub fn required_string(&self, field: &'static str) -> Result<String, CodecError> {
        self.required_text(field).map(str::to_string)
    }

    /// Mandatory text child; an empty element counts as absent.
    pub fn required_text(&self, field: &'static str) -> Result<&'a str, CodecError> {
        match self.optional_text(field) {
            Some(text) if !text.trim().is_empty() => Ok(text.trim()),
            _ => Err(self.missing(field)),
        }
    }

    pub fn required<T>(&self, field: &'static str) -> Result<T, CodecError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let raw = self.required_text(field)?;
        raw.parse().map_err(|e| self.invalid(field, e))
    }

    pub fn optional<T>(&self, field: &'static str) -> Result<Option<T>, CodecError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.optional_text(field).map(str::trim) {
            Some(raw) if !raw.is_empty() => raw.parse().map(Some).map_err(|e| self.invalid(field, e)),
            _ => Ok(None),
        }
    }

    pub fn repeated<T>(&self, field: &'static str) -> Result<Vec<T>, CodecError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.children(field)
            .iter()
            .map(|c| {
                c.element
                    .text()
                    .trim()
                    .parse()
                    .map_err(|e| self.invalid(field, e))
            })
            .collect()
    }

    /// Text of this element itself
    pub fn own_text<T>(&self, field: &'static str) -> Result<T, CodecError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let raw = self.element.text().trim();
        if raw.is_empty() {
            return Err(self.missing(field));
        }
        raw.parse().map_err(|e| self.invalid(field, e))
    }

    // ── Attributes ─────────────────────────────────────────

    pub fn optional_attr<T>(&self, attribute: &'static str) -> Result<Option<T>, CodecError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.element.attr(attribute).map(str::trim) {
            Some(raw) if !raw.is_empty() => raw
                .parse()
                .map(Some)
                .map_err(|e| self.invalid(attribute, e)),
            _ => Ok(None),
        }
    }

    pub fn required_attr<T>(&self, attribute: &'static str) -> Result<T, CodecError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.optional_attr(attribute)?
            .ok_or_else(|| self.missing(attribute))
    }

    // ── Timestamps (`<field><DateTime>…</DateTime></field>`) ──

    pub fn optional_datetime(
        &self,
        field: &'static str,
    ) -> Result<Option<DateTime<Utc>>, CodecError> {
        match self.optional_child(field) {
            Some(wrapper) => {
                let raw = wrapper
                    .optional_text("DateTime")
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| self.missing(field))?;
                parse_datetime(raw)
                    .map(Some)
                    .map_err(|e| self.invalid(field, e))
            }
            None => Ok(None),
        }
    }

    pub fn required_datetime(&self, field: &'static str) -> Result<DateTime<Utc>, CodecError> {
        self.optional_datetime(field)?
            .ok_or_else(|| self.missing(field))
    }

    pub fn optional_datetime_attr(
        &self,
        attribute: &'static str,
    ) -> Result<Option<DateTime<Utc>>, CodecError> {
        match self.element.attr(attribute).map(str::trim) {
            Some(raw) if !raw.is_empty() => parse_datetime(raw)
                .map(Some)
                .map_err(|e| self.invalid(attribute, e)),
            _ => Ok(None),
        }
    }
}

// ── Writing helpers ────────────────────────────────────────────

pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn parse_datetime(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc))
}

/// `<field>text</field>` in the given namespace
pub fn text_element(namespace: &str, field: &str, value: impl Into<String>) -> XElement {
    XElement::new(XName::new(namespace, field)).with_text(value)
}

pub fn opt_text_element(
    namespace: &str,
    field: &str,
    value: Option<impl Into<String>>,
) -> Option<XElement> {
    value.map(|v| text_element(namespace, field, v))
}

/// `<field><DateTime>…</DateTime></field>`
pub fn datetime_element(namespace: &str, field: &str, value: &DateTime<Utc>) -> XElement {
    XElement::new(XName::new(namespace, field))
        .with_child(text_element(namespace, "DateTime", format_datetime(value)))
}

/// Mandatory string content must not be blank.
pub fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Missing(field));
    }
    Ok(())
}

pub fn require_some<T>(field: &'static str, values: &[T]) -> Result<(), ValidationError> {
    if values.is_empty() {
        return Err(ValidationError::Missing(field));
    }
    Ok(())
}

pub fn opt_datetime_element(
    namespace: &str,
    field: &str,
    value: Option<&DateTime<Utc>>,
) -> Option<XElement> {
    value.map(|v| datetime_element(namespace, field, v))
}

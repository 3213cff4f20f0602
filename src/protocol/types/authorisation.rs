//! Roaming authorisation (token whitelist) records

use chrono::{DateTime, Utc};

use crate::protocol::codec::{
    datetime_element, opt_text_element, require_text, text_element, wire_enum, FieldReader,
    WireRecord,
};
use crate::protocol::namespaces::OCHP;
use crate::protocol::xml::{XElement, XName};
use crate::support::errors::{CodecError, ValidationError};

wire_enum! {
    /// How the token instance is represented on the wire
    pub enum Representation {
        Plain => "plain",
        Sha160 => "sha-160",
        Sha256 => "sha-256",
    }
}

wire_enum! {
    pub enum TokenType {
        Rfid => "rfid",
        Remote => "remote",
        Iso15118 => "15118",
    }
}

wire_enum! {
    pub enum TokenSubType {
        MifareCls => "mifareCls",
        MifareDes => "mifareDes",
        Calypso => "calypso",
    }
}

/// Electronic mobility token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmtId {
    pub representation: Representation,
    pub instance: String,
    pub token_type: TokenType,
    pub token_sub_type: Option<TokenSubType>,
}

impl WireRecord for EmtId {
    fn read(fields: &FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            representation: fields.required_attr("representation")?,
            instance: fields.required_string("instance")?,
            token_type: fields.required("tokenType")?,
            token_sub_type: fields.optional("tokenSubType")?,
        })
    }

    fn write(&self, name: XName) -> XElement {
        XElement::new(name)
            .with_attr("representation", self.representation.as_wire())
            .with_child(text_element(OCHP, "instance", self.instance.clone()))
            .with_child(text_element(OCHP, "tokenType", self.token_type.as_wire()))
            .with_opt_child(opt_text_element(
                OCHP,
                "tokenSubType",
                self.token_sub_type.map(|t| t.as_wire()),
            ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoamingAuthorisationInfo {
    pub emt_id: EmtId,
    pub contract_id: String,
    pub printed_number: Option<String>,
    pub expiry_date: DateTime<Utc>,
}

impl RoamingAuthorisationInfo {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("instance", &self.emt_id.instance)?;
        require_text("contractId", &self.contract_id)
    }
}

impl WireRecord for RoamingAuthorisationInfo {
    fn read(fields: &FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            emt_id: fields.required_record("EmtId")?,
            contract_id: fields.required_string("contractId")?,
            printed_number: fields.optional_string("printedNumber"),
            expiry_date: fields.required_datetime("expiryDate")?,
        })
    }

    fn write(&self, name: XName) -> XElement {
        XElement::new(name)
            .with_child(self.emt_id.write(XName::ochp("EmtId")))
            .with_child(text_element(OCHP, "contractId", self.contract_id.clone()))
            .with_opt_child(opt_text_element(OCHP, "printedNumber", self.printed_number.clone()))
            .with_child(datetime_element(OCHP, "expiryDate", &self.expiry_date))
    }
}

//! Live EVSE and parking status records

use chrono::{DateTime, Utc};

use crate::domain::EvseId;
use crate::protocol::codec::{format_datetime, text_element, wire_enum, FieldReader, WireRecord};
use crate::protocol::namespaces::OCHP;
use crate::protocol::xml::{XElement, XName};
use crate::support::errors::CodecError;

wire_enum! {
    pub enum MajorStatus {
        Available => "available",
        NotAvailable => "not-available",
        Unknown => "unknown",
    }
}

wire_enum! {
    pub enum MinorStatus {
        Available => "available",
        Reserved => "reserved",
        Charging => "charging",
        Blocked => "blocked",
        OutOfOrder => "outoforder",
        Unknown => "unknown",
    }
}

wire_enum! {
    pub enum ParkingSpotStatus {
        Available => "available",
        NotAvailable => "not-available",
        Unknown => "unknown",
    }
}

wire_enum! {
    /// Status kinds a `GetStatus` request may be narrowed to
    pub enum StatusKind {
        Evse => "evse",
        Parking => "parking",
        Combined => "combined",
    }
}

/// `<evse major=".." minor=".." ttl=".."><evseId>..</evseId></evse>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvseStatus {
    pub evse_id: EvseId,
    pub major: MajorStatus,
    pub minor: Option<MinorStatus>,
    /// Status is valid until this instant
    pub ttl: Option<DateTime<Utc>>,
}

impl WireRecord for EvseStatus {
    fn read(fields: &FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            evse_id: fields.required("evseId")?,
            major: fields.required_attr("major")?,
            minor: fields.optional_attr("minor")?,
            ttl: fields.optional_datetime_attr("ttl")?,
        })
    }

    fn write(&self, name: XName) -> XElement {
        XElement::new(name)
            .with_attr("major", self.major.as_wire())
            .with_opt_attr("minor", self.minor.map(|m| m.as_wire()))
            .with_opt_attr("ttl", self.ttl.as_ref().map(format_datetime))
            .with_child(text_element(OCHP, "evseId", self.evse_id.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParkingStatus {
    pub parking_id: String,
    pub status: ParkingSpotStatus,
    pub ttl: Option<DateTime<Utc>>,
}

impl WireRecord for ParkingStatus {
    fn read(fields: &FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            parking_id: fields.required_text("parkingId")?.to_string(),
            status: fields.required_attr("status")?,
            ttl: fields.optional_datetime_attr("ttl")?,
        })
    }

    fn write(&self, name: XName) -> XElement {
        XElement::new(name)
            .with_attr("status", self.status.as_wire())
            .with_opt_attr("ttl", self.ttl.as_ref().map(format_datetime))
            .with_child(text_element(OCHP, "parkingId", self.parking_id.clone()))
    }
}

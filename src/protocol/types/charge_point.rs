//! `ChargePointInfo` and the records nested in it
//!
//! Children are written in schema order; the remote side validates against
//! the XSD and rejects reordered sequences.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveTime, Utc};

use super::flags::{wire_flags, FlagSet};
use crate::domain::EvseId;
use crate::protocol::codec::{
    opt_datetime_element, opt_text_element, require_some, require_text,
    text_element, wire_enum, FieldReader, WireRecord,
};
use crate::protocol::namespaces::OCHP;
use crate::protocol::xml::{XElement, XName};
use crate::support::errors::{CodecError, ValidationError};

wire_enum! {
    pub enum AuthMethod {
        Unknown => "Unknown",
        Public => "Public",
        LocalKey => "LocalKey",
        DirectCash => "DirectCash",
        DirectCreditcard => "DirectCreditcard",
        DirectDebitcard => "DirectDebitcard",
        RfidMifareCls => "RfidMifareCls",
        RfidMifareDes => "RfidMifareDes",
        RfidCalypso => "RfidCalypso",
        Iec15118 => "Iec15118",
    }
}

wire_flags!(AuthMethod);

wire_enum! {
    pub enum ParkingRestriction {
        Unknown => "unknown",
        EvOnly => "evonly",
        Plugged => "plugged",
        Disabled => "disabled",
        Customers => "customers",
        Motorcycles => "motorcycles",
    }
}

wire_flags!(ParkingRestriction);

wire_enum! {
    /// General type of the charge point location
    pub enum GeneralLocation {
        OnStreet => "on-street",
        ParkingGarage => "parking-garage",
        UndergroundGarage => "underground-garage",
        ParkingLot => "parking-lot",
        Private => "private",
        Other => "other",
        Unknown => "unknown",
    }
}

wire_enum! {
    /// Operational state of the charge point as a whole
    pub enum ChargePointStatus {
        Unknown => "Unknown",
        Operative => "Operative",
        Inoperative => "Inoperative",
        Planned => "Planned",
        Closed => "Closed",
    }
}

wire_enum! {
    pub enum ChargePointType {
        Ac => "AC",
        Dc => "DC",
    }
}

wire_enum! {
    pub enum ConnectorFormat {
        Socket => "Socket",
        Cable => "Cable",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargePointAddress {
    pub house_number: Option<String>,
    /// Street
    pub address: String,
    pub city: String,
    pub zip_code: String,
    /// ISO 3166-1 alpha-3
    pub country: String,
}

impl WireRecord for ChargePointAddress {
    fn read(fields: &FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            house_number: fields.optional_string("houseNumber"),
            address: fields.required_string("address")?,
            city: fields.required_string("city")?,
            zip_code: fields.required_string("zipCode")?,
            country: fields.required_string("country")?,
        })
    }

    fn write(&self, name: XName) -> XElement {
        XElement::new(name)
            .with_opt_child(opt_text_element(OCHP, "houseNumber", self.house_number.clone()))
            .with_child(text_element(OCHP, "address", self.address.clone()))
            .with_child(text_element(OCHP, "city", self.city.clone()))
            .with_child(text_element(OCHP, "zipCode", self.zip_code.clone()))
            .with_child(text_element(OCHP, "country", self.country.clone()))
    }
}

/// `<chargePointLocation lat=".." lon=".."/>`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl WireRecord for GeoPoint {
    fn read(fields: &FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            lat: fields.required_attr("lat")?,
            lon: fields.required_attr("lon")?,
        })
    }

    fn write(&self, name: XName) -> XElement {
        XElement::new(name)
            .with_attr("lat", self.lat.to_string())
            .with_attr("lon", self.lon.to_string())
    }
}

/// Wall-clock time as `HH:MM`; `24:00` closes a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HourMinute {
    hour: u8,
    minute: u8,
}

impl HourMinute {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        let valid = (hour < 24 && minute < 60) || (hour == 24 && minute == 0);
        valid.then_some(Self { hour, minute })
    }

    /// `24:00` saturates to the last second of the day.
    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour.into(), self.minute.into(), 0)
            .or_else(|| NaiveTime::from_hms_opt(23, 59, 59))
            .unwrap_or_default()
    }

    pub fn from_naive_time(time: NaiveTime) -> Self {
        use chrono::Timelike;
        if time.hour() == 23 && time.minute() == 59 && time.second() == 59 {
            return Self { hour: 24, minute: 0 };
        }
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
        }
    }
}

impl FromStr for HourMinute {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hour, minute) = s
            .split_once(':')
            .ok_or_else(|| format!("'{}' is not HH:MM", s))?;
        if hour.len() != 2 || minute.len() != 2 {
            return Err(format!("'{}' is not HH:MM", s));
        }
        let hour: u8 = hour.parse().map_err(|_| format!("'{}' is not HH:MM", s))?;
        let minute: u8 = minute.parse().map_err(|_| format!("'{}' is not HH:MM", s))?;
        Self::new(hour, minute).ok_or_else(|| format!("'{}' is out of range", s))
    }
}

impl fmt::Display for HourMinute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// `<regularHours weekday="1" periodBegin="08:00" periodEnd="18:00"/>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegularHours {
    /// 1 = Monday … 7 = Sunday
    pub weekday: u8,
    pub period_begin: HourMinute,
    pub period_end: HourMinute,
}

impl WireRecord for RegularHours {
    fn read(fields: &FieldReader<'_>) -> Result<Self, CodecError> {
        let weekday: u8 = fields.required_attr("weekday")?;
        if !(1..=7).contains(&weekday) {
            return Err(fields.invalid("weekday", format!("{} is not in 1..=7", weekday)));
        }
        Ok(Self {
            weekday,
            period_begin: fields.required_attr("periodBegin")?,
            period_end: fields.required_attr("periodEnd")?,
        })
    }

    fn write(&self, name: XName) -> XElement {
        XElement::new(name)
            .with_attr("weekday", self.weekday.to_string())
            .with_attr("periodBegin", self.period_begin.to_string())
            .with_attr("periodEnd", self.period_end.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hours {
    TwentyFourSeven,
    /// No entries means closed
    Regular(Vec<RegularHours>),
}

impl WireRecord for Hours {
    fn read(fields: &FieldReader<'_>) -> Result<Self, CodecError> {
        if fields.optional::<bool>("twentyfourseven")? == Some(true) {
            return Ok(Self::TwentyFourSeven);
        }
        Ok(Self::Regular(fields.records("regularHours")?))
    }

    fn write(&self, name: XName) -> XElement {
        match self {
            Self::TwentyFourSeven => {
                XElement::new(name).with_child(text_element(OCHP, "twentyfourseven", "true"))
            }
            Self::Regular(hours) => XElement::new(name)
                .with_children(hours.iter().map(|h| h.write(XName::ochp("regularHours")))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ratings {
    /// kW
    pub maximum_power: f64,
    pub guaranteed_power: Option<f64>,
    /// V
    pub nominal_voltage: Option<u32>,
}

impl WireRecord for Ratings {
    fn read(fields: &FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            maximum_power: fields.required_attr("maximumPower")?,
            guaranteed_power: fields.optional_attr("guaranteedPower")?,
            nominal_voltage: fields.optional_attr("nominalVoltage")?,
        })
    }

    fn write(&self, name: XName) -> XElement {
        XElement::new(name)
            .with_attr("maximumPower", self.maximum_power.to_string())
            .with_opt_attr("guaranteedPower", self.guaranteed_power.map(|p| p.to_string()))
            .with_opt_attr("nominalVoltage", self.nominal_voltage.map(|v| v.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connector {
    /// e.g. `IEC_62196_T2`, `Chademo`
    pub standard: String,
    pub format: ConnectorFormat,
}

impl WireRecord for Connector {
    fn read(fields: &FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            standard: fields.required_string("connectorStandard")?,
            format: fields.required("connectorFormat")?,
        })
    }

    fn write(&self, name: XName) -> XElement {
        XElement::new(name)
            .with_child(text_element(OCHP, "connectorStandard", self.standard.clone()))
            .with_child(text_element(OCHP, "connectorFormat", self.format.as_wire()))
    }
}

/// Static description of one EVSE and the location it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargePointInfo {
    pub evse_id: EvseId,
    pub location_id: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub location_name: String,
    pub location_name_lang: String,
    pub address: ChargePointAddress,
    pub location: GeoPoint,
    pub time_zone: Option<String>,
    pub opening_times: Option<Hours>,
    pub status: Option<ChargePointStatus>,
    pub telephone_number: Option<String>,
    pub general_location: GeneralLocation,
    pub floor_level: Option<String>,
    pub parking_slot_number: Option<String>,
    pub parking_restrictions: FlagSet<ParkingRestriction>,
    pub ratings: Option<Ratings>,
    pub user_interface_lang: Vec<String>,
    pub auth_methods: FlagSet<AuthMethod>,
    pub connectors: Vec<Connector>,
    pub charge_point_type: ChargePointType,
}

impl ChargePointInfo {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("locationId", &self.location_id)?;
        require_text("locationName", &self.location_name)?;
        require_text("locationNameLang", &self.location_name_lang)?;
        require_text("address", &self.address.address)?;
        require_text("city", &self.address.city)?;
        require_text("zipCode", &self.address.zip_code)?;
        require_text("country", &self.address.country)?;
        require_some("authMethods", &self.auth_methods.expand())?;
        require_some("connectors", &self.connectors)?;
        for connector in &self.connectors {
            require_text("connectorStandard", &connector.standard)?;
        }
        Ok(())
    }
}

impl WireRecord for ChargePointInfo {
    fn read(fields: &FieldReader<'_>) -> Result<Self, CodecError> {
        if fields.children("authMethods").is_empty() {
            return Err(fields.missing("authMethods"));
        }
        Ok(Self {
            evse_id: fields.required("evseId")?,
            location_id: fields.required_string("locationId")?,
            timestamp: fields.optional_datetime("timestamp")?,
            location_name: fields.required_string("locationName")?,
            location_name_lang: fields.required_string("locationNameLang")?,
            address: fields.required_record("chargePointAddress")?,
            location: fields.required_record("chargePointLocation")?,
            time_zone: fields.optional_string("timeZone"),
            opening_times: fields.optional_record("openingTimes")?,
            status: fields.optional("status")?,
            telephone_number: fields.optional_string("telephoneNumber"),
            general_location: fields.required("location")?,
            floor_level: fields.optional_string("floorLevel"),
            parking_slot_number: fields.optional_string("parkingSlotNumber"),
            parking_restrictions: FlagSet::read(fields, "parkingRestriction"),
            ratings: fields.optional_record("ratings")?,
            user_interface_lang: fields.repeated("userInterfaceLang")?,
            auth_methods: FlagSet::read(fields, "authMethods"),
            connectors: fields.required_records("connectors")?,
            charge_point_type: fields.required("chargePointType")?,
        })
    }

    fn write(&self, name: XName) -> XElement {
        XElement::new(name)
            .with_child(text_element(OCHP, "evseId", self.evse_id.as_str()))
            .with_child(text_element(OCHP, "locationId", self.location_id.clone()))
            .with_opt_child(opt_datetime_element(OCHP, "timestamp", self.timestamp.as_ref()))
            .with_child(text_element(OCHP, "locationName", self.location_name.clone()))
            .with_child(text_element(OCHP, "locationNameLang", self.location_name_lang.clone()))
            .with_child(self.address.write(XName::ochp("chargePointAddress")))
            .with_child(self.location.write(XName::ochp("chargePointLocation")))
            .with_opt_child(opt_text_element(OCHP, "timeZone", self.time_zone.clone()))
            .with_opt_child(
                self.opening_times
                    .as_ref()
                    .map(|h| h.write(XName::ochp("openingTimes"))),
            )
            .with_opt_child(opt_text_element(OCHP, "status", self.status.map(|s| s.as_wire())))
            .with_opt_child(opt_text_element(OCHP, "telephoneNumber", self.telephone_number.clone()))
            .with_child(text_element(OCHP, "location", self.general_location.as_wire()))
            .with_opt_child(opt_text_element(OCHP, "floorLevel", self.floor_level.clone()))
            .with_opt_child(opt_text_element(
                OCHP,
                "parkingSlotNumber",
                self.parking_slot_number.clone(),
            ))
            .with_children(self.parking_restrictions.write(OCHP, "parkingRestriction"))
            .with_opt_child(self.ratings.as_ref().map(|r| r.write(XName::ochp("ratings"))))
            .with_children(
                self.user_interface_lang
                    .iter()
                    .map(|lang| text_element(OCHP, "userInterfaceLang", lang.clone())),
            )
            .with_children(self.auth_methods.write(OCHP, "authMethods"))
            .with_children(
                self.connectors
                    .iter()
                    .map(|c| c.write(XName::ochp("connectors"))),
            )
            .with_child(text_element(OCHP, "chargePointType", self.charge_point_type.as_wire()))
    }
}

//! Tariff records
//!
//! Prices are decimals; they are never round-tripped through floats.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::charge_point::RegularHours;
use crate::protocol::codec::{
    opt_datetime_element, require_some, require_text, text_element, wire_enum, FieldReader,
    WireRecord,
};
use crate::protocol::namespaces::OCHP;
use crate::protocol::xml::{XElement, XName};
use crate::support::errors::{CodecError, ValidationError};

wire_enum! {
    pub enum BillingItem {
        ParkingTime => "parkingtime",
        UsageTime => "usagetime",
        Energy => "energy",
        Power => "power",
        ServiceFee => "serviceFee",
        Departure => "departure",
        Reservation => "reservation",
        ReservationTime => "reservationtime",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceComponent {
    pub billing_item: BillingItem,
    pub item_price: Decimal,
    /// Minimum billed amount of the item, in its unit
    pub step_size: u32,
}

impl WireRecord for PriceComponent {
    fn read(fields: &FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            billing_item: fields.required("billingItem")?,
            item_price: fields.required("itemPrice")?,
            step_size: fields.required("stepSize")?,
        })
    }

    fn write(&self, name: XName) -> XElement {
        XElement::new(name)
            .with_child(text_element(OCHP, "billingItem", self.billing_item.as_wire()))
            .with_child(text_element(OCHP, "itemPrice", self.item_price.to_string()))
            .with_child(text_element(OCHP, "stepSize", self.step_size.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TariffRestriction {
    pub regular_hours: Vec<RegularHours>,
    pub start_date_time: Option<DateTime<Utc>>,
    pub end_date_time: Option<DateTime<Utc>>,
}

impl WireRecord for TariffRestriction {
    fn read(fields: &FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            regular_hours: fields.records("regularHours")?,
            start_date_time: fields.optional_datetime("startDateTime")?,
            end_date_time: fields.optional_datetime("endDateTime")?,
        })
    }

    fn write(&self, name: XName) -> XElement {
        XElement::new(name)
            .with_children(
                self.regular_hours
                    .iter()
                    .map(|h| h.write(XName::ochp("regularHours"))),
            )
            .with_opt_child(opt_datetime_element(
                OCHP,
                "startDateTime",
                self.start_date_time.as_ref(),
            ))
            .with_opt_child(opt_datetime_element(
                OCHP,
                "endDateTime",
                self.end_date_time.as_ref(),
            ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TariffElement {
    pub restriction: Option<TariffRestriction>,
    pub price_components: Vec<PriceComponent>,
}

impl WireRecord for TariffElement {
    fn read(fields: &FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            restriction: fields.optional_record("tariffRestriction")?,
            price_components: fields.required_records("priceComponent")?,
        })
    }

    fn write(&self, name: XName) -> XElement {
        XElement::new(name)
            .with_opt_child(
                self.restriction
                    .as_ref()
                    .map(|r| r.write(XName::ochp("tariffRestriction"))),
            )
            .with_children(
                self.price_components
                    .iter()
                    .map(|p| p.write(XName::ochp("priceComponent"))),
            )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndividualTariff {
    pub elements: Vec<TariffElement>,
    /// Providers the tariff applies to; empty means everyone
    pub recipients: Vec<String>,
    /// ISO 4217
    pub currency: String,
}

impl WireRecord for IndividualTariff {
    fn read(fields: &FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            elements: fields.required_records("tariffElement")?,
            recipients: fields.repeated("recipient")?,
            currency: fields.required_string("currency")?,
        })
    }

    fn write(&self, name: XName) -> XElement {
        XElement::new(name)
            .with_children(
                self.elements
                    .iter()
                    .map(|e| e.write(XName::ochp("tariffElement"))),
            )
            .with_children(
                self.recipients
                    .iter()
                    .map(|r| text_element(OCHP, "recipient", r.clone())),
            )
            .with_child(text_element(OCHP, "currency", self.currency.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TariffInfo {
    pub tariff_id: String,
    pub individual_tariffs: Vec<IndividualTariff>,
}

impl TariffInfo {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("tariffId", &self.tariff_id)?;
        require_some("individualTariff", &self.individual_tariffs)?;
        for tariff in &self.individual_tariffs {
            require_some("tariffElement", &tariff.elements)?;
            require_text("currency", &tariff.currency)?;
            for element in &tariff.elements {
                require_some("priceComponent", &element.price_components)?;
            }
        }
        Ok(())
    }
}

impl WireRecord for TariffInfo {
    fn read(fields: &FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            tariff_id: fields.required_string("tariffId")?,
            individual_tariffs: fields.required_records("individualTariff")?,
        })
    }

    fn write(&self, name: XName) -> XElement {
        XElement::new(name)
            .with_child(text_element(OCHP, "tariffId", self.tariff_id.clone()))
            .with_children(
                self.individual_tariffs
                    .iter()
                    .map(|t| t.write(XName::ochp("individualTariff"))),
            )
    }
}

//! Charge detail records

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::authorisation::EmtId;
use super::charge_point::{ChargePointType, Connector};
use super::tariff::BillingItem;
use crate::domain::EvseId;
use crate::protocol::codec::{
    datetime_element, opt_text_element, require_some, require_text, text_element, wire_enum,
    FieldReader, WireRecord,
};
use crate::protocol::namespaces::OCHP;
use crate::protocol::xml::{XElement, XName};
use crate::support::errors::{CodecError, ValidationError};

wire_enum! {
    pub enum CdrStatus {
        New => "new",
        Accepted => "accepted",
        Rejected => "rejected",
        OwnerDeclined => "owner-declined",
        Approved => "approved",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdrPeriod {
    pub start_date_time: DateTime<Utc>,
    pub end_date_time: DateTime<Utc>,
    pub billing_item: BillingItem,
    pub billing_value: Decimal,
    pub item_price: Decimal,
    pub period_cost: Option<Decimal>,
}

impl WireRecord for CdrPeriod {
    fn read(fields: &FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            start_date_time: fields.required_datetime("startDateTime")?,
            end_date_time: fields.required_datetime("endDateTime")?,
            billing_item: fields.required("billingItem")?,
            billing_value: fields.required("billingValue")?,
            item_price: fields.required("itemPrice")?,
            period_cost: fields.optional("periodCost")?,
        })
    }

    fn write(&self, name: XName) -> XElement {
        XElement::new(name)
            .with_child(datetime_element(OCHP, "startDateTime", &self.start_date_time))
            .with_child(datetime_element(OCHP, "endDateTime", &self.end_date_time))
            .with_child(text_element(OCHP, "billingItem", self.billing_item.as_wire()))
            .with_child(text_element(OCHP, "billingValue", self.billing_value.to_string()))
            .with_child(text_element(OCHP, "itemPrice", self.item_price.to_string()))
            .with_opt_child(opt_text_element(
                OCHP,
                "periodCost",
                self.period_cost.map(|c| c.to_string()),
            ))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CdrInfo {
    pub cdr_id: String,
    pub evse_id: EvseId,
    pub emt_id: EmtId,
    pub contract_id: String,
    pub live_auth_id: Option<String>,
    pub status: CdrStatus,
    pub start_date_time: DateTime<Utc>,
    pub end_date_time: DateTime<Utc>,
    /// `hhh:mm:ss`
    pub duration: Option<String>,
    pub charge_point_type: ChargePointType,
    pub connector_type: Connector,
    /// kW
    pub max_socket_power: f64,
    pub meter_id: Option<String>,
    pub charging_periods: Vec<CdrPeriod>,
    pub total_cost: Option<Decimal>,
    pub currency: String,
}

impl CdrInfo {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("cdrId", &self.cdr_id)?;
        require_text("contractId", &self.contract_id)?;
        require_text("currency", &self.currency)?;
        require_some("chargingPeriods", &self.charging_periods)?;
        if self.end_date_time < self.start_date_time {
            return Err(ValidationError::Invalid {
                field: "endDateTime",
                reason: "ends before it starts".into(),
            });
        }
        Ok(())
    }
}

impl WireRecord for CdrInfo {
    fn read(fields: &FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            cdr_id: fields.required_string("CdrId")?,
            evse_id: fields.required("evseId")?,
            emt_id: fields.required_record("emtId")?,
            contract_id: fields.required_string("contractId")?,
            live_auth_id: fields.optional_string("liveAuthId"),
            status: fields.required("status")?,
            start_date_time: fields.required_datetime("startDateTime")?,
            end_date_time: fields.required_datetime("endDateTime")?,
            duration: fields.optional_string("duration"),
            charge_point_type: fields.required("chargePointType")?,
            connector_type: fields.required_record("connectorType")?,
            max_socket_power: fields.required("maxSocketPower")?,
            meter_id: fields.optional_string("meterId"),
            charging_periods: fields.required_records("chargingPeriods")?,
            total_cost: fields.optional("totalCost")?,
            currency: fields.required_string("currency")?,
        })
    }

    fn write(&self, name: XName) -> XElement {
        XElement::new(name)
            .with_child(text_element(OCHP, "CdrId", self.cdr_id.clone()))
            .with_child(text_element(OCHP, "evseId", self.evse_id.as_str()))
            .with_child(self.emt_id.write(XName::ochp("emtId")))
            .with_child(text_element(OCHP, "contractId", self.contract_id.clone()))
            .with_opt_child(opt_text_element(OCHP, "liveAuthId", self.live_auth_id.clone()))
            .with_child(text_element(OCHP, "status", self.status.as_wire()))
            .with_child(datetime_element(OCHP, "startDateTime", &self.start_date_time))
            .with_child(datetime_element(OCHP, "endDateTime", &self.end_date_time))
            .with_opt_child(opt_text_element(OCHP, "duration", self.duration.clone()))
            .with_child(text_element(OCHP, "chargePointType", self.charge_point_type.as_wire()))
            .with_child(self.connector_type.write(XName::ochp("connectorType")))
            .with_child(text_element(OCHP, "maxSocketPower", self.max_socket_power.to_string()))
            .with_opt_child(opt_text_element(OCHP, "meterId", self.meter_id.clone()))
            .with_children(
                self.charging_periods
                    .iter()
                    .map(|p| p.write(XName::ochp("chargingPeriods"))),
            )
            .with_opt_child(opt_text_element(
                OCHP,
                "totalCost",
                self.total_cost.map(|c| c.to_string()),
            ))
            .with_child(text_element(OCHP, "currency", self.currency.clone()))
    }
}

use chrono::{DateTime, Utc};

use super::{list_response, OchpOperation};
use crate::protocol::codec::{datetime_element, FieldReader, OchpMessage};
use crate::protocol::namespaces::OCHP;
use crate::protocol::types::ChargePointInfo;
use crate::protocol::xml::XElement;
use crate::support::errors::CodecError;

/// Full charge point list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetChargePointListRequest;

impl OchpMessage for GetChargePointListRequest {
    const TAG: &'static str = "GetChargePointListRequest";

    fn parse_body(_fields: &FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self)
    }

    fn to_wire(&self) -> XElement {
        Self::wire_root()
    }
}

impl OchpOperation for GetChargePointListRequest {
    type Response = GetChargePointListResponse;
    const NAME: &'static str = "GetChargePointList";
}

list_response!(
    GetChargePointListResponse,
    "GetChargePointListResponse",
    ChargePointInfo,
    "chargePointInfoArray"
);

/// Charge points changed since `last_update`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetChargePointListUpdatesRequest {
    pub last_update: DateTime<Utc>,
}

impl OchpMessage for GetChargePointListUpdatesRequest {
    const TAG: &'static str = "GetChargePointListUpdatesRequest";

    fn parse_body(fields: &FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            last_update: fields.required_datetime("lastUpdate")?,
        })
    }

    fn to_wire(&self) -> XElement {
        Self::wire_root().with_child(datetime_element(OCHP, "lastUpdate", &self.last_update))
    }
}

impl OchpOperation for GetChargePointListUpdatesRequest {
    type Response = GetChargePointListUpdatesResponse;
    const NAME: &'static str = "GetChargePointListUpdates";
}

list_response!(
    GetChargePointListUpdatesResponse,
    "GetChargePointListUpdatesResponse",
    ChargePointInfo,
    "chargePointInfoArray"
);

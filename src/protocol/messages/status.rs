use chrono::{DateTime, Utc};

use super::OchpOperation;
use crate::protocol::codec::{
    opt_datetime_element, opt_text_element, FieldReader, OchpMessage, OchpResponse, WireRecord,
};
use crate::protocol::namespaces::OCHP;
use crate::protocol::result::OchpResult;
use crate::protocol::types::{EvseStatus, ParkingStatus, StatusKind};
use crate::protocol::xml::{XElement, XName};
use crate::support::errors::CodecError;

/// Live status, optionally only changes since `start_date_time`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetStatusRequest {
    pub start_date_time: Option<DateTime<Utc>>,
    pub status_type: Option<StatusKind>,
}

impl OchpMessage for GetStatusRequest {
    const TAG: &'static str = "GetStatusRequest";

    fn parse_body(fields: &FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            start_date_time: fields.optional_datetime("startDateTime")?,
            status_type: fields.optional("statusType")?,
        })
    }

    fn to_wire(&self) -> XElement {
        Self::wire_root()
            .with_opt_child(opt_datetime_element(
                OCHP,
                "startDateTime",
                self.start_date_time.as_ref(),
            ))
            .with_opt_child(opt_text_element(
                OCHP,
                "statusType",
                self.status_type.map(|s| s.as_wire()),
            ))
    }
}

impl OchpOperation for GetStatusRequest {
    type Response = GetStatusResponse;
    const NAME: &'static str = "GetStatus";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetStatusResponse {
    pub result: OchpResult,
    pub evse: Vec<EvseStatus>,
    pub parking: Vec<ParkingStatus>,
}

impl OchpMessage for GetStatusResponse {
    const TAG: &'static str = "GetStatusResponse";

    fn parse_body(fields: &FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            result: OchpResult::read_from_response(fields)?,
            evse: fields.records("evse")?,
            parking: fields.records("parking")?,
        })
    }

    fn to_wire(&self) -> XElement {
        Self::wire_root()
            .with_child(self.result.write(XName::ochp("result")))
            .with_children(self.evse.iter().map(|s| s.write(XName::ochp("evse"))))
            .with_children(self.parking.iter().map(|s| s.write(XName::ochp("parking"))))
    }
}

impl OchpResponse for GetStatusResponse {
    fn from_result(result: OchpResult) -> Self {
        Self {
            result,
            evse: Vec::new(),
            parking: Vec::new(),
        }
    }

    fn result(&self) -> &OchpResult {
        &self.result
    }
}

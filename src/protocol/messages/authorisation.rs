use chrono::{DateTime, Utc};

use super::{list_response, OchpOperation};
use crate::protocol::codec::{datetime_element, FieldReader, OchpMessage};
use crate::protocol::namespaces::OCHP;
use crate::protocol::types::RoamingAuthorisationInfo;
use crate::protocol::xml::XElement;
use crate::support::errors::CodecError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetRoamingAuthorisationListRequest;

impl OchpMessage for GetRoamingAuthorisationListRequest {
    const TAG: &'static str = "GetRoamingAuthorisationListRequest";

    fn parse_body(_fields: &FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self)
    }

    fn to_wire(&self) -> XElement {
        Self::wire_root()
    }
}

impl OchpOperation for GetRoamingAuthorisationListRequest {
    type Response = GetRoamingAuthorisationListResponse;
    const NAME: &'static str = "GetRoamingAuthorisationList";
}

list_response!(
    GetRoamingAuthorisationListResponse,
    "GetRoamingAuthorisationListResponse",
    RoamingAuthorisationInfo,
    "roamingAuthorisationInfoArray"
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetRoamingAuthorisationListUpdatesRequest {
    pub last_update: DateTime<Utc>,
}

impl OchpMessage for GetRoamingAuthorisationListUpdatesRequest {
    const TAG: &'static str = "GetRoamingAuthorisationListUpdatesRequest";

    fn parse_body(fields: &FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            last_update: fields.required_datetime("lastUpdate")?,
        })
    }

    fn to_wire(&self) -> XElement {
        Self::wire_root().with_child(datetime_element(OCHP, "lastUpdate", &self.last_update))
    }
}

impl OchpOperation for GetRoamingAuthorisationListUpdatesRequest {
    type Response = GetRoamingAuthorisationListUpdatesResponse;
    const NAME: &'static str = "GetRoamingAuthorisationListUpdates";
}

list_response!(
    GetRoamingAuthorisationListUpdatesResponse,
    "GetRoamingAuthorisationListUpdatesResponse",
    RoamingAuthorisationInfo,
    "roamingAuthorisationInfoArray"
);

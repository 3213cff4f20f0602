use chrono::{DateTime, Utc};

use super::{list_response, OchpOperation};
use crate::protocol::codec::{opt_datetime_element, FieldReader, OchpMessage};
use crate::protocol::namespaces::OCHP;
use crate::protocol::types::TariffInfo;
use crate::protocol::xml::XElement;
use crate::support::errors::CodecError;

/// Tariffs changed since `last_update`, or all when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetTariffUpdatesRequest {
    pub last_update: Option<DateTime<Utc>>,
}

impl OchpMessage for GetTariffUpdatesRequest {
    const TAG: &'static str = "GetTariffUpdatesRequest";

    fn parse_body(fields: &FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            last_update: fields.optional_datetime("lastUpdate")?,
        })
    }

    fn to_wire(&self) -> XElement {
        Self::wire_root().with_opt_child(opt_datetime_element(
            OCHP,
            "lastUpdate",
            self.last_update.as_ref(),
        ))
    }
}

impl OchpOperation for GetTariffUpdatesRequest {
    type Response = GetTariffUpdatesResponse;
    const NAME: &'static str = "GetTariffUpdates";
}

list_response!(
    GetTariffUpdatesResponse,
    "GetTariffUpdatesResponse",
    TariffInfo,
    "TariffInfoArray"
);

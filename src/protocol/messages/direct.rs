//! Direct-charging extension, `http://ochp.eu/direct/0.2/`

use chrono::{DateTime, Utc};

use super::OchpOperation;
use crate::domain::EvseId;
use crate::protocol::codec::{
    opt_datetime_element, opt_text_element, require_text, text_element, FieldReader, OchpMessage,
    OchpResponse, WireRecord,
};
use crate::protocol::namespaces::OCHP_DIRECT;
use crate::protocol::result::OchpResult;
use crate::protocol::xml::{XElement, XName};
use crate::support::errors::{CodecError, ValidationError};

/// Reserve an EVSE for a direct charging session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectEvseRequest {
    pub evse_id: EvseId,
    pub contract_id: String,
    pub reserve_until: Option<DateTime<Utc>>,
}

impl SelectEvseRequest {
    pub fn new(
        evse_id: EvseId,
        contract_id: impl Into<String>,
        reserve_until: Option<DateTime<Utc>>,
    ) -> Result<Self, ValidationError> {
        let request = Self {
            evse_id,
            contract_id: contract_id.into(),
            reserve_until,
        };
        request.validate()?;
        Ok(request)
    }
}

impl OchpMessage for SelectEvseRequest {
    const TAG: &'static str = "SelectEvseRequest";
    const NAMESPACE: &'static str = OCHP_DIRECT;

    fn parse_body(fields: &FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            evse_id: fields.required("evseId")?,
            contract_id: fields.required_string("contractId")?,
            reserve_until: fields.optional_datetime("reserveUntil")?,
        })
    }

    fn to_wire(&self) -> XElement {
        Self::wire_root()
            .with_child(text_element(OCHP_DIRECT, "evseId", self.evse_id.as_str()))
            .with_child(text_element(OCHP_DIRECT, "contractId", self.contract_id.clone()))
            .with_opt_child(opt_datetime_element(
                OCHP_DIRECT,
                "reserveUntil",
                self.reserve_until.as_ref(),
            ))
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("contractId", &self.contract_id)
    }
}

impl OchpOperation for SelectEvseRequest {
    type Response = SelectEvseResponse;
    const NAME: &'static str = "SelectEvse";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectEvseResponse {
    pub result: OchpResult,
    /// Session handle for follow-up direct calls
    pub direct_id: Option<String>,
    pub ttl: Option<DateTime<Utc>>,
}

impl OchpMessage for SelectEvseResponse {
    const TAG: &'static str = "SelectEvseResponse";
    const NAMESPACE: &'static str = OCHP_DIRECT;

    fn parse_body(fields: &FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            result: OchpResult::read_from_response(fields)?,
            direct_id: fields.optional_string("directId"),
            ttl: fields.optional_datetime("ttl")?,
        })
    }

    fn to_wire(&self) -> XElement {
        Self::wire_root()
            .with_child(self.result.write(XName::new(OCHP_DIRECT, "result")))
            .with_opt_child(opt_text_element(OCHP_DIRECT, "directId", self.direct_id.clone()))
            .with_opt_child(opt_datetime_element(OCHP_DIRECT, "ttl", self.ttl.as_ref()))
    }
}

impl OchpResponse for SelectEvseResponse {
    fn from_result(result: OchpResult) -> Self {
        Self {
            result,
            direct_id: None,
            ttl: None,
        }
    }

    fn result(&self) -> &OchpResult {
        &self.result
    }
}

use super::{list_response, OchpOperation};
use crate::protocol::codec::{opt_text_element, FieldReader, OchpMessage};
use crate::protocol::namespaces::OCHP;
use crate::protocol::types::{CdrInfo, CdrStatus};
use crate::protocol::xml::XElement;
use crate::support::errors::CodecError;

/// Charge detail records, optionally narrowed to one status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetCdrsRequest {
    pub cdr_status: Option<CdrStatus>,
}

impl OchpMessage for GetCdrsRequest {
    const TAG: &'static str = "GetCDRsRequest";

    fn parse_body(fields: &FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            cdr_status: fields.optional("cdrStatus")?,
        })
    }

    fn to_wire(&self) -> XElement {
        Self::wire_root().with_opt_child(opt_text_element(
            OCHP,
            "cdrStatus",
            self.cdr_status.map(|s| s.as_wire()),
        ))
    }
}

impl OchpOperation for GetCdrsRequest {
    type Response = GetCdrsResponse;
    const NAME: &'static str = "GetCDRs";
}

list_response!(GetCdrsResponse, "GetCDRsResponse", CdrInfo, "cdrInfoArray");

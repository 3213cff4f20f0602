//! Request/response pairs built on the generic message contract

pub mod authorisation;
pub mod cdr;
pub mod charge_point_list;
pub mod direct;
pub mod status;
pub mod tariff;

use super::codec::{OchpMessage, OchpResponse};

pub use authorisation::{
    GetRoamingAuthorisationListRequest, GetRoamingAuthorisationListResponse,
    GetRoamingAuthorisationListUpdatesRequest, GetRoamingAuthorisationListUpdatesResponse,
};
pub use cdr::{GetCdrsRequest, GetCdrsResponse};
pub use charge_point_list::{
    GetChargePointListRequest, GetChargePointListResponse, GetChargePointListUpdatesRequest,
    GetChargePointListUpdatesResponse,
};
pub use direct::{SelectEvseRequest, SelectEvseResponse};
pub use status::{GetStatusRequest, GetStatusResponse};
pub use tariff::{GetTariffUpdatesRequest, GetTariffUpdatesResponse};

/// A request the remote side answers with [`OchpOperation::Response`].
pub trait OchpOperation: OchpMessage {
    type Response: OchpResponse;

    /// Operation name, used for the SOAPAction header, logs and metrics
    const NAME: &'static str;

    fn soap_action() -> String {
        format!("{}/{}", Self::NAMESPACE.trim_end_matches('/'), Self::NAME)
    }
}

/// Response carrying a result followed by a repeated record field.
macro_rules! list_response {
    (
        $(#[$meta:meta])*
        $name:ident, $tag:literal, $item:ty, $field:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name {
            pub result: $crate::protocol::result::OchpResult,
            pub items: Vec<$item>,
        }

        impl $name {
            pub fn new(result: $crate::protocol::result::OchpResult, items: Vec<$item>) -> Self {
                Self { result, items }
            }
        }

        impl $crate::protocol::codec::OchpMessage for $name {
            const TAG: &'static str = $tag;

            fn parse_body(
                fields: &$crate::protocol::codec::FieldReader<'_>,
            ) -> Result<Self, $crate::support::errors::CodecError> {
                Ok(Self {
                    result: $crate::protocol::result::OchpResult::read_from_response(fields)?,
                    items: fields.records($field)?,
                })
            }

            fn to_wire(&self) -> $crate::protocol::xml::XElement {
                use $crate::protocol::codec::WireRecord;
                use $crate::protocol::xml::XName;
                <Self as $crate::protocol::codec::OchpMessage>::wire_root()
                    .with_child(self.result.write(XName::ochp("result")))
                    .with_children(self.items.iter().map(|i| i.write(XName::ochp($field))))
            }

            fn validate(&self) -> Result<(), $crate::support::errors::ValidationError> {
                self.items.iter().try_for_each(|i| i.validate())
            }
        }

        impl $crate::protocol::codec::OchpResponse for $name {
            fn from_result(result: $crate::protocol::result::OchpResult) -> Self {
                Self::new(result, Vec::new())
            }

            fn result(&self) -> &$crate::protocol::result::OchpResult {
                &self.result
            }
        }
    };
}

pub(crate) use list_response;

//! Records nested inside OCHP messages

pub mod authorisation;
pub mod cdr;
pub mod charge_point;
pub mod flags;
pub mod status;
pub mod tariff;

pub use authorisation::{EmtId, Representation, RoamingAuthorisationInfo, TokenSubType, TokenType};
pub use cdr::{CdrInfo, CdrPeriod, CdrStatus};
pub use charge_point::{
    AuthMethod, ChargePointAddress, ChargePointInfo, ChargePointStatus, ChargePointType,
    Connector, ConnectorFormat, GeneralLocation, GeoPoint, HourMinute, Hours, ParkingRestriction,
    Ratings, RegularHours,
};
pub use flags::{Flag, FlagSet};
pub use status::{EvseStatus, MajorStatus, MinorStatus, ParkingSpotStatus, ParkingStatus, StatusKind};
pub use tariff::{BillingItem, IndividualTariff, PriceComponent, TariffElement, TariffInfo, TariffRestriction};

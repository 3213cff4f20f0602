pub mod ids;
pub mod model;
pub mod repositories;

pub use ids::{ChargingPoolId, ChargingStationId, EvseId, OperatorId};
pub use model::{
    Accessibility, Address, AuthenticationMode, ChargingPool, ChargingStation, CurrentType, Evse,
    EvseStatusType, GeoCoordinate, OpeningTimes, PaymentOption, RegularHours, SocketOutlet,
};

pub use repositories::{
    AuthorisationStore, ChargingPoolRepository, ChargingStationRepository, EvseRepository,
    RoamingNetwork, TariffStore, Upsert,
};

pub use crate::support::errors::{DomainError, DomainResult};

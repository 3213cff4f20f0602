//! Repository traits for the local entity hierarchy
//!
//! Contains:
//! - one repository per aggregate (pools, stations, EVSEs)
//! - record stores for roaming data that has no local aggregate of its own
//! - `RoamingNetwork` — unified access to all of them

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    ChargingPool, ChargingPoolId, ChargingStation, ChargingStationId, DomainResult, Evse, EvseId,
    EvseStatusType,
};
use crate::protocol::types::{EmtId, RoamingAuthorisationInfo, TariffInfo};

#[async_trait]
pub trait ChargingPoolRepository: Send + Sync {
    async fn find_by_id(&self, id: &ChargingPoolId) -> DomainResult<Option<ChargingPool>>;
    async fn create(&self, pool: ChargingPool) -> DomainResult<()>;
    async fn update(&self, pool: ChargingPool) -> DomainResult<()>;
}

#[async_trait]
pub trait ChargingStationRepository: Send + Sync {
    async fn find_by_id(&self, id: &ChargingStationId) -> DomainResult<Option<ChargingStation>>;
    async fn create(&self, station: ChargingStation) -> DomainResult<()>;
    async fn update(&self, station: ChargingStation) -> DomainResult<()>;
}

#[async_trait]
pub trait EvseRepository: Send + Sync {
    async fn find_by_id(&self, id: &EvseId) -> DomainResult<Option<Evse>>;
    async fn create(&self, evse: Evse) -> DomainResult<()>;
    async fn update(&self, evse: Evse) -> DomainResult<()>;
    async fn update_status(
        &self,
        id: &EvseId,
        status: EvseStatusType,
        changed_at: DateTime<Utc>,
    ) -> DomainResult<()>;
}

/// Outcome of storing a record keyed by its own identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Created,
    Updated,
    Unchanged,
}

#[async_trait]
pub trait TariffStore: Send + Sync {
    async fn find(&self, tariff_id: &str) -> DomainResult<Option<TariffInfo>>;
    async fn upsert(&self, tariff: TariffInfo) -> DomainResult<Upsert>;
}

#[async_trait]
pub trait AuthorisationStore: Send + Sync {
    async fn find(&self, emt_id: &EmtId) -> DomainResult<Option<RoamingAuthorisationInfo>>;
    async fn upsert(&self, authorisation: RoamingAuthorisationInfo) -> DomainResult<Upsert>;
}

/// Provides access to the local roaming network.
///
/// ```ignore
/// async fn touch(network: &dyn RoamingNetwork, id: &EvseId) -> DomainResult<()> {
///     if let Some(evse) = network.evses().find_by_id(id).await? {
///         network.evses().update(evse).await?;
///     }
///     Ok(())
/// }
/// ```
pub trait RoamingNetwork: Send + Sync {
    fn pools(&self) -> &dyn ChargingPoolRepository;
    fn stations(&self) -> &dyn ChargingStationRepository;
    fn evses(&self) -> &dyn EvseRepository;
    fn tariffs(&self) -> &dyn TariffStore;
    fn authorisations(&self) -> &dyn AuthorisationStore;
}

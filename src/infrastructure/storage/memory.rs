//! In-memory roaming network

use std::hash::Hash;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::{
    AuthorisationStore, ChargingPool, ChargingPoolId, ChargingPoolRepository, ChargingStation,
    ChargingStationId, ChargingStationRepository, DomainError, DomainResult, Evse, EvseId,
    EvseRepository, EvseStatusType, RoamingNetwork, TariffStore, Upsert,
};
use crate::protocol::types::{EmtId, RoamingAuthorisationInfo, TariffInfo};

/// DashMap-backed local entity hierarchy for development and testing
#[derive(Default)]
pub struct InMemoryRoamingNetwork {
    pools: MemoryPools,
    stations: MemoryStations,
    evses: MemoryEvses,
    tariffs: MemoryTariffs,
    authorisations: MemoryAuthorisations,
}

/// Entity counts, for summaries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkSize {
    pub pools: usize,
    pub stations: usize,
    pub evses: usize,
    pub tariffs: usize,
    pub authorisations: usize,
}

impl InMemoryRoamingNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(&self) -> NetworkSize {
        NetworkSize {
            pools: self.pools.0.len(),
            stations: self.stations.0.len(),
            evses: self.evses.0.len(),
            tariffs: self.tariffs.0.len(),
            authorisations: self.authorisations.0.len(),
        }
    }
}

impl RoamingNetwork for InMemoryRoamingNetwork {
    fn pools(&self) -> &dyn ChargingPoolRepository {
        &self.pools
    }

    fn stations(&self) -> &dyn ChargingStationRepository {
        &self.stations
    }

    fn evses(&self) -> &dyn EvseRepository {
        &self.evses
    }

    fn tariffs(&self) -> &dyn TariffStore {
        &self.tariffs
    }

    fn authorisations(&self) -> &dyn AuthorisationStore {
        &self.authorisations
    }
}

#[derive(Default)]
struct MemoryPools(DashMap<ChargingPoolId, ChargingPool>);

#[async_trait]
impl ChargingPoolRepository for MemoryPools {
    async fn find_by_id(&self, id: &ChargingPoolId) -> DomainResult<Option<ChargingPool>> {
        Ok(self.0.get(id).map(|p| p.clone()))
    }

    async fn create(&self, pool: ChargingPool) -> DomainResult<()> {
        if self.0.contains_key(&pool.id) {
            return Err(DomainError::Conflict {
                entity: "charging pool",
                id: pool.id.to_string(),
            });
        }
        self.0.insert(pool.id.clone(), pool);
        Ok(())
    }

    async fn update(&self, pool: ChargingPool) -> DomainResult<()> {
        match self.0.get_mut(&pool.id) {
            Some(mut entry) => {
                *entry = pool;
                Ok(())
            }
            None => Err(DomainError::NotFound {
                entity: "charging pool",
                id: pool.id.to_string(),
            }),
        }
    }
}

#[derive(Default)]
struct MemoryStations(DashMap<ChargingStationId, ChargingStation>);

#[async_trait]
impl ChargingStationRepository for MemoryStations {
    async fn find_by_id(&self, id: &ChargingStationId) -> DomainResult<Option<ChargingStation>> {
        Ok(self.0.get(id).map(|s| s.clone()))
    }

    async fn create(&self, station: ChargingStation) -> DomainResult<()> {
        if self.0.contains_key(&station.id) {
            return Err(DomainError::Conflict {
                entity: "charging station",
                id: station.id.to_string(),
            });
        }
        self.0.insert(station.id.clone(), station);
        Ok(())
    }

    async fn update(&self, station: ChargingStation) -> DomainResult<()> {
        match self.0.get_mut(&station.id) {
            Some(mut entry) => {
                *entry = station;
                Ok(())
            }
            None => Err(DomainError::NotFound {
                entity: "charging station",
                id: station.id.to_string(),
            }),
        }
    }
}

#[derive(Default)]
struct MemoryEvses(DashMap<EvseId, Evse>);

#[async_trait]
impl EvseRepository for MemoryEvses {
    async fn find_by_id(&self, id: &EvseId) -> DomainResult<Option<Evse>> {
        Ok(self.0.get(id).map(|e| e.clone()))
    }

    async fn create(&self, evse: Evse) -> DomainResult<()> {
        if self.0.contains_key(&evse.id) {
            return Err(DomainError::Conflict {
                entity: "EVSE",
                id: evse.id.to_string(),
            });
        }
        self.0.insert(evse.id.clone(), evse);
        Ok(())
    }

    async fn update(&self, evse: Evse) -> DomainResult<()> {
        match self.0.get_mut(&evse.id) {
            Some(mut entry) => {
                *entry = evse;
                Ok(())
            }
            None => Err(DomainError::NotFound {
                entity: "EVSE",
                id: evse.id.to_string(),
            }),
        }
    }

    async fn update_status(
        &self,
        id: &EvseId,
        status: EvseStatusType,
        changed_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        if let Some(mut evse) = self.0.get_mut(id) {
            evse.status = status;
            evse.status_changed_at = Some(changed_at);
            Ok(())
        } else {
            Err(DomainError::NotFound {
                entity: "EVSE",
                id: id.to_string(),
            })
        }
    }
}

#[derive(Default)]
struct MemoryTariffs(DashMap<String, TariffInfo>);

#[async_trait]
impl TariffStore for MemoryTariffs {
    async fn find(&self, tariff_id: &str) -> DomainResult<Option<TariffInfo>> {
        Ok(self.0.get(tariff_id).map(|t| t.clone()))
    }

    async fn upsert(&self, tariff: TariffInfo) -> DomainResult<Upsert> {
        Ok(upsert(&self.0, tariff.tariff_id.clone(), tariff))
    }
}

#[derive(Default)]
struct MemoryAuthorisations(DashMap<EmtId, RoamingAuthorisationInfo>);

#[async_trait]
impl AuthorisationStore for MemoryAuthorisations {
    async fn find(&self, emt_id: &EmtId) -> DomainResult<Option<RoamingAuthorisationInfo>> {
        Ok(self.0.get(emt_id).map(|a| a.clone()))
    }

    async fn upsert(&self, authorisation: RoamingAuthorisationInfo) -> DomainResult<Upsert> {
        Ok(upsert(&self.0, authorisation.emt_id.clone(), authorisation))
    }
}

fn upsert<K, V>(map: &DashMap<K, V>, key: K, value: V) -> Upsert
where
    K: Hash + Eq,
    V: PartialEq,
{
    match map.entry(key) {
        Entry::Vacant(slot) => {
            slot.insert(value);
            Upsert::Created
        }
        Entry::Occupied(slot) if *slot.get() == value => Upsert::Unchanged,
        Entry::Occupied(mut slot) => {
            slot.insert(value);
            Upsert::Updated
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::authorisation::fixtures::authorisation;
    use crate::protocol::types::tariff::fixtures::tariff;

    #[tokio::test]
    async fn create_twice_conflicts() {
        let network = InMemoryRoamingNetwork::new();
        let derived = crate::application::sync::reconcile::derive(
            &crate::protocol::types::charge_point::fixtures::charge_point(
                "DE*ABC*E1",
                "LOC-1",
                "Invalidenstraße",
            ),
        )
        .unwrap();

        network.pools().create(derived.pool.clone()).await.unwrap();
        let err = network.pools().create(derived.pool).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
        assert_eq!(network.size().pools, 1);
    }

    #[tokio::test]
    async fn status_update_of_missing_evse_fails() {
        let network = InMemoryRoamingNetwork::new();
        let err = network
            .evses()
            .update_status(
                &"DE*ABC*E1".parse().unwrap(),
                EvseStatusType::Available,
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "EVSE", .. }));
    }

    #[tokio::test]
    async fn upsert_reports_created_updated_unchanged() {
        let network = InMemoryRoamingNetwork::new();
        let tariffs = network.tariffs();
        assert_eq!(tariffs.upsert(tariff("T1", "0.30")).await.unwrap(), Upsert::Created);
        assert_eq!(tariffs.upsert(tariff("T1", "0.30")).await.unwrap(), Upsert::Unchanged);
        assert_eq!(tariffs.upsert(tariff("T1", "0.35")).await.unwrap(), Upsert::Updated);
        assert_eq!(
            tariffs.find("T1").await.unwrap().unwrap().individual_tariffs[0].elements[0]
                .price_components[0]
                .item_price
                .to_string(),
            "0.35"
        );

        let info = authorisation("04A2B3C4", "DE-XYZ-C1");
        let auths = network.authorisations();
        assert_eq!(auths.upsert(info.clone()).await.unwrap(), Upsert::Created);
        assert_eq!(auths.find(&info.emt_id).await.unwrap(), Some(info));
    }
}

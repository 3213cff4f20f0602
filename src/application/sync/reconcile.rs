//! Reconciliation of remote snapshots into the local roaming network
//!
//! Charge points are grouped by operator. Within a group every record is
//! derived and every identity collision resolved before the first mutating
//! call, so a collision never leaves a half-applied group behind. A storage
//! failure aborts only the group it happened in.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::report::{Change, Diagnostic, DiagnosticKind, SyncReport};
use crate::domain::{
    Address, ChargingPool, ChargingPoolId, ChargingStation, ChargingStationId, DomainResult, Evse,
    EvseId, EvseStatusType, GeoCoordinate, OperatorId, RoamingNetwork,
};
use crate::protocol::mapping::{
    accessibility, auth_methods_to_local, current_type, from_protocol_status,
    opening_times_to_local, socket_outlet,
};
use crate::protocol::types::{ChargePointInfo, EvseStatus, RoamingAuthorisationInfo, TariffInfo};
use crate::support::errors::ValidationError;

/// Operator-acceptance predicate: an empty include list admits everyone
/// not explicitly excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatorFilter {
    include: BTreeSet<OperatorId>,
    exclude: BTreeSet<OperatorId>,
}

impl OperatorFilter {
    pub fn accept_all() -> Self {
        Self::default()
    }

    pub fn new(
        include: impl IntoIterator<Item = OperatorId>,
        exclude: impl IntoIterator<Item = OperatorId>,
    ) -> Self {
        Self {
            include: include.into_iter().collect(),
            exclude: exclude.into_iter().collect(),
        }
    }

    pub fn accepts(&self, operator: &OperatorId) -> bool {
        !self.exclude.contains(operator)
            && (self.include.is_empty() || self.include.contains(operator))
    }
}

/// Local entities derived from one remote charge point
#[derive(Debug, Clone)]
pub(crate) struct Derived {
    pub pool: ChargingPool,
    pub station: ChargingStation,
    pub evse: Evse,
}

pub(crate) fn derive(record: &ChargePointInfo) -> Result<Derived, ValidationError> {
    let operator = record.evse_id.operator_id();
    let geo = GeoCoordinate::new(record.location.lat, record.location.lon)?;
    let address = Address {
        house_number: record.address.house_number.clone(),
        street: record.address.address.clone(),
        city: record.address.city.clone(),
        zip_code: record.address.zip_code.clone(),
        country: record.address.country.clone(),
    };
    let pool_id = ChargingPoolId::derive(&operator, &address, &geo);
    let station_id = record.evse_id.station_id();
    let opening_times = record.opening_times.as_ref().map(opening_times_to_local);
    let access = accessibility(record.general_location, record.parking_restrictions);
    let (authentication_modes, payment_options) = auth_methods_to_local(record.auth_methods);

    Ok(Derived {
        pool: ChargingPool {
            id: pool_id.clone(),
            operator_id: operator,
            location_id: record.location_id.clone(),
            name: record.location_name.clone(),
            name_language: record.location_name_lang.clone(),
            address: address.clone(),
            geo,
            time_zone: record.time_zone.clone(),
            opening_times: opening_times.clone(),
            accessibility: access,
        },
        station: ChargingStation {
            id: station_id.clone(),
            pool_id,
            description: Some(record.location_name.clone()),
            address,
            geo,
            authentication_modes,
            payment_options,
            accessibility: access,
            opening_times,
            telephone: record.telephone_number.clone(),
        },
        evse: Evse {
            id: record.evse_id.clone(),
            station_id,
            status: EvseStatusType::Unspecified,
            status_changed_at: None,
            current_type: current_type(record.charge_point_type),
            sockets: record.connectors.iter().map(socket_outlet).collect(),
            max_power_kw: record.ratings.as_ref().map(|r| r.maximum_power),
            floor_level: record.floor_level.clone(),
            parking_slot: record.parking_slot_number.clone(),
        },
    })
}

fn group_by_operator<T>(
    records: Vec<T>,
    evse_id: impl Fn(&T) -> &EvseId,
) -> BTreeMap<OperatorId, Vec<T>> {
    let mut groups: BTreeMap<OperatorId, Vec<T>> = BTreeMap::new();
    for record in records {
        let operator = evse_id(&record).operator_id();
        groups.entry(operator).or_default().push(record);
    }
    groups
}

fn reject_operator(report: &mut SyncReport, operator: &OperatorId, count: usize) {
    report.rejected += count;
    report.diagnose(
        Diagnostic::new(
            DiagnosticKind::OperatorRejected,
            format!("{count} records skipped"),
        )
        .operator(operator),
    );
}

fn group_failed(report: &mut SyncReport, operator: &OperatorId, err: impl std::fmt::Display) {
    warn!(operator = %operator, error = %err, "Operator group aborted");
    report.diagnose(
        Diagnostic::new(DiagnosticKind::GroupFailed, err.to_string()).operator(operator),
    );
}

fn skip_evse(
    report: &mut SyncReport,
    operator: &OperatorId,
    kind: DiagnosticKind,
    evse_id: &EvseId,
    message: impl Into<String>,
) {
    report.operator_mut(operator).evses.record(Change::Skipped);
    report.diagnose(
        Diagnostic::new(kind, message)
            .operator(operator)
            .subject(evse_id.as_str()),
    );
}

pub(crate) async fn reconcile_charge_points(
    network: &dyn RoamingNetwork,
    filter: &OperatorFilter,
    records: Vec<ChargePointInfo>,
    report: &mut SyncReport,
) {
    for (operator, group) in group_by_operator(records, |r| &r.evse_id) {
        if !filter.accepts(&operator) {
            reject_operator(report, &operator, group.len());
            continue;
        }
        if let Err(err) = reconcile_group(network, &operator, group, report).await {
            group_failed(report, &operator, err);
        }
    }
}

async fn reconcile_group(
    network: &dyn RoamingNetwork,
    operator: &OperatorId,
    records: Vec<ChargePointInfo>,
    report: &mut SyncReport,
) -> DomainResult<()> {
    // Make sure the operator shows up even if every record gets skipped.
    report.operator_mut(operator);

    let mut seen = HashSet::new();
    let mut derived = Vec::with_capacity(records.len());
    for record in &records {
        if !seen.insert(record.evse_id.clone()) {
            skip_evse(
                report,
                operator,
                DiagnosticKind::DuplicateEvse,
                &record.evse_id,
                "EVSE listed more than once; first record kept",
            );
            continue;
        }
        match derive(record) {
            Ok(entities) => derived.push(entities),
            Err(err) => skip_evse(
                report,
                operator,
                DiagnosticKind::InvalidRecord,
                &record.evse_id,
                err.to_string(),
            ),
        }
    }

    let derived = resolve_pool_collisions(network, operator, derived, report).await?;
    let derived = resolve_station_collisions(operator, derived, report);

    let mut pools_done = HashSet::new();
    let mut stations_done = HashSet::new();
    for entities in &derived {
        if pools_done.insert(entities.pool.id.clone()) {
            let change = upsert_pool(network, &entities.pool).await?;
            report.operator_mut(operator).pools.record(change);
        }
        if stations_done.insert(entities.station.id.clone()) {
            let change = upsert_station(network, &entities.station).await?;
            report.operator_mut(operator).stations.record(change);
        }
        let change = upsert_evse(network, &entities.evse).await?;
        report.operator_mut(operator).evses.record(change);
    }
    Ok(())
}

/// A pool is bound to one location: the location already stored for the
/// pool wins, otherwise the smallest location id claiming it in this batch.
async fn resolve_pool_collisions(
    network: &dyn RoamingNetwork,
    operator: &OperatorId,
    derived: Vec<Derived>,
    report: &mut SyncReport,
) -> DomainResult<Vec<Derived>> {
    let mut locations: BTreeMap<ChargingPoolId, BTreeSet<String>> = BTreeMap::new();
    for entities in &derived {
        locations
            .entry(entities.pool.id.clone())
            .or_default()
            .insert(entities.pool.location_id.clone());
    }

    let mut winners: HashMap<ChargingPoolId, String> = HashMap::new();
    for (pool_id, candidates) in locations {
        let stored = network
            .pools()
            .find_by_id(&pool_id)
            .await?
            .map(|pool| pool.location_id);
        let winner = match stored {
            Some(location) => Some(location),
            None if candidates.len() > 1 => candidates.first().cloned(),
            None => None,
        };
        if let Some(winner) = winner {
            winners.insert(pool_id, winner);
        }
    }

    Ok(derived
        .into_iter()
        .filter(|entities| match winners.get(&entities.pool.id) {
            Some(winner) if *winner != entities.pool.location_id => {
                skip_evse(
                    report,
                    operator,
                    DiagnosticKind::IdentityCollision,
                    &entities.evse.id,
                    format!(
                        "pool {} is bound to location {}, record carries location {}",
                        entities.pool.id, winner, entities.pool.location_id
                    ),
                );
                false
            }
            _ => true,
        })
        .collect())
}

/// One station id derived into several pools: the smallest pool id wins.
fn resolve_station_collisions(
    operator: &OperatorId,
    derived: Vec<Derived>,
    report: &mut SyncReport,
) -> Vec<Derived> {
    let mut pools: HashMap<ChargingStationId, BTreeSet<ChargingPoolId>> = HashMap::new();
    for entities in &derived {
        pools
            .entry(entities.station.id.clone())
            .or_default()
            .insert(entities.pool.id.clone());
    }
    let winners: HashMap<ChargingStationId, ChargingPoolId> = pools
        .into_iter()
        .filter(|(_, candidates)| candidates.len() > 1)
        .filter_map(|(station, candidates)| candidates.first().cloned().map(|pool| (station, pool)))
        .collect();

    derived
        .into_iter()
        .filter(|entities| match winners.get(&entities.station.id) {
            Some(winner) if *winner != entities.pool.id => {
                skip_evse(
                    report,
                    operator,
                    DiagnosticKind::IdentityCollision,
                    &entities.evse.id,
                    format!(
                        "station {} already belongs to pool {}, record derives pool {}",
                        entities.station.id, winner, entities.pool.id
                    ),
                );
                false
            }
            _ => true,
        })
        .collect()
}

async fn upsert_pool(network: &dyn RoamingNetwork, pool: &ChargingPool) -> DomainResult<Change> {
    let Some(mut existing) = network.pools().find_by_id(&pool.id).await? else {
        network.pools().create(pool.clone()).await?;
        return Ok(Change::Created);
    };
    let changed = existing.merge_from(pool);
    if changed.is_empty() {
        return Ok(Change::Unchanged);
    }
    debug!(pool = %pool.id, fields = ?changed, "Updating charging pool");
    network.pools().update(existing).await?;
    Ok(Change::Updated)
}

async fn upsert_station(
    network: &dyn RoamingNetwork,
    station: &ChargingStation,
) -> DomainResult<Change> {
    let Some(mut existing) = network.stations().find_by_id(&station.id).await? else {
        network.stations().create(station.clone()).await?;
        return Ok(Change::Created);
    };
    let changed = existing.merge_from(station);
    if changed.is_empty() {
        return Ok(Change::Unchanged);
    }
    debug!(station = %station.id, fields = ?changed, "Updating charging station");
    network.stations().update(existing).await?;
    Ok(Change::Updated)
}

async fn upsert_evse(network: &dyn RoamingNetwork, evse: &Evse) -> DomainResult<Change> {
    let Some(mut existing) = network.evses().find_by_id(&evse.id).await? else {
        network.evses().create(evse.clone()).await?;
        return Ok(Change::Created);
    };
    let changed = existing.merge_from(evse);
    if changed.is_empty() {
        return Ok(Change::Unchanged);
    }
    debug!(evse = %evse.id, fields = ?changed, "Updating EVSE");
    network.evses().update(existing).await?;
    Ok(Change::Updated)
}

pub(crate) async fn reconcile_statuses(
    network: &dyn RoamingNetwork,
    filter: &OperatorFilter,
    statuses: Vec<EvseStatus>,
    observed_at: DateTime<Utc>,
    report: &mut SyncReport,
) {
    for (operator, group) in group_by_operator(statuses, |s| &s.evse_id) {
        if !filter.accepts(&operator) {
            reject_operator(report, &operator, group.len());
            continue;
        }
        if let Err(err) = reconcile_status_group(network, &operator, group, observed_at, report).await
        {
            group_failed(report, &operator, err);
        }
    }
}

async fn reconcile_status_group(
    network: &dyn RoamingNetwork,
    operator: &OperatorId,
    statuses: Vec<EvseStatus>,
    observed_at: DateTime<Utc>,
    report: &mut SyncReport,
) -> DomainResult<()> {
    for status in statuses {
        let local = from_protocol_status(status.major, status.minor);
        match network.evses().find_by_id(&status.evse_id).await? {
            None => {
                report.statuses.record(Change::Skipped);
                report.diagnose(
                    Diagnostic::new(DiagnosticKind::UnknownEvse, "no local EVSE with this id")
                        .operator(operator)
                        .subject(status.evse_id.as_str()),
                );
            }
            Some(evse) if evse.status == local => report.statuses.record(Change::Unchanged),
            Some(_) => {
                network
                    .evses()
                    .update_status(&status.evse_id, local, observed_at)
                    .await?;
                report.statuses.record(Change::Updated);
            }
        }
    }
    Ok(())
}

pub(crate) async fn store_tariffs(
    network: &dyn RoamingNetwork,
    tariffs: Vec<TariffInfo>,
    report: &mut SyncReport,
) {
    for tariff in tariffs {
        let subject = tariff.tariff_id.clone();
        let outcome = match tariff.validate() {
            Ok(()) => network
                .tariffs()
                .upsert(tariff)
                .await
                .map_err(|err| (DiagnosticKind::GroupFailed, err.to_string())),
            Err(err) => Err((DiagnosticKind::InvalidRecord, err.to_string())),
        };
        match outcome {
            Ok(upsert) => report.tariffs.record(upsert.into()),
            Err((kind, message)) => {
                report.tariffs.record(Change::Skipped);
                report.diagnose(Diagnostic::new(kind, message).subject(subject));
            }
        }
    }
}

pub(crate) async fn store_authorisations(
    network: &dyn RoamingNetwork,
    authorisations: Vec<RoamingAuthorisationInfo>,
    report: &mut SyncReport,
) {
    for authorisation in authorisations {
        let subject = authorisation.contract_id.clone();
        let outcome = match authorisation.validate() {
            Ok(()) => network
                .authorisations()
                .upsert(authorisation)
                .await
                .map_err(|err| (DiagnosticKind::GroupFailed, err.to_string())),
            Err(err) => Err((DiagnosticKind::InvalidRecord, err.to_string())),
        };
        match outcome {
            Ok(upsert) => report.authorisations.record(upsert.into()),
            Err((kind, message)) => {
                report.authorisations.record(Change::Skipped);
                report.diagnose(Diagnostic::new(kind, message).subject(subject));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::sync::engine::JobKind;
    use crate::application::sync::testing::FailingPools;
    use crate::domain::Accessibility;
    use crate::infrastructure::storage::InMemoryRoamingNetwork;
    use crate::protocol::types::charge_point::fixtures::charge_point;
    use crate::protocol::types::{MajorStatus, MinorStatus};

    fn report() -> SyncReport {
        SyncReport::new(JobKind::PullData, Utc::now())
    }

    fn operator(id: &str) -> OperatorId {
        id.parse().unwrap()
    }

    #[test]
    fn filter_include_and_exclude() {
        let all = OperatorFilter::accept_all();
        assert!(all.accepts(&operator("DE*ABC")));

        let only = OperatorFilter::new([operator("DE*ABC")], []);
        assert!(only.accepts(&operator("DE*ABC")));
        assert!(!only.accepts(&operator("DE*XYZ")));

        let except = OperatorFilter::new([], [operator("DE*XYZ")]);
        assert!(except.accepts(&operator("DE*ABC")));
        assert!(!except.accepts(&operator("DE*XYZ")));
    }

    #[test]
    fn derive_maps_record_into_hierarchy() {
        let record = charge_point("DE*ABC*E1234*1", "LOC-1", "Invalidenstraße");
        let derived = derive(&record).unwrap();

        assert_eq!(derived.station.id.as_str(), "DE*ABC*S1234");
        assert_eq!(derived.evse.station_id, derived.station.id);
        assert_eq!(derived.station.pool_id, derived.pool.id);
        assert!(derived.pool.id.as_str().starts_with("DE*ABC*P"));
        assert_eq!(derived.pool.location_id, "LOC-1");
        assert_eq!(derived.pool.accessibility, Accessibility::Public);
        assert_eq!(derived.evse.status, EvseStatusType::Unspecified);
        assert_eq!(derived.evse.sockets.len(), 1);
    }

    #[test]
    fn derive_rejects_out_of_range_coordinates() {
        let mut record = charge_point("DE*ABC*E1", "LOC-1", "Invalidenstraße");
        record.location.lat = 123.0;
        assert!(derive(&record).is_err());
    }

    #[tokio::test]
    async fn same_location_shares_one_pool() {
        let network = InMemoryRoamingNetwork::new();
        let mut report = report();
        let records = vec![
            charge_point("DE*ABC*E1", "LOC-1", "Invalidenstraße"),
            charge_point("DE*ABC*E2", "LOC-1", "Invalidenstraße"),
        ];
        reconcile_charge_points(&network, &OperatorFilter::accept_all(), records, &mut report)
            .await;

        assert_eq!(report.pools().created, 1);
        assert_eq!(report.stations().created, 2);
        assert_eq!(report.evses().created, 2);
        assert!(report.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn pool_collision_keeps_smallest_location_and_records_it() {
        let network = InMemoryRoamingNetwork::new();
        let mut report = report();
        let records = vec![
            charge_point("DE*ABC*E2", "LOC-B", "Invalidenstraße"),
            charge_point("DE*ABC*E1", "LOC-A", "Invalidenstraße"),
        ];
        reconcile_charge_points(&network, &OperatorFilter::accept_all(), records, &mut report)
            .await;

        assert_eq!(report.pools().created, 1);
        assert_eq!(report.evses().created, 1);
        assert_eq!(report.evses().skipped, 1);
        let collisions: Vec<_> = report
            .diagnostics_of(DiagnosticKind::IdentityCollision)
            .collect();
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].subject.as_deref(), Some("DE*ABC*E2"));

        let evse_id: EvseId = "DE*ABC*E1".parse().unwrap();
        assert!(network.evses().find_by_id(&evse_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn pool_collision_prefers_stored_location() {
        let network = InMemoryRoamingNetwork::new();
        let mut first = report();
        reconcile_charge_points(
            &network,
            &OperatorFilter::accept_all(),
            vec![charge_point("DE*ABC*E2", "LOC-B", "Invalidenstraße")],
            &mut first,
        )
        .await;

        let mut second = report();
        reconcile_charge_points(
            &network,
            &OperatorFilter::accept_all(),
            vec![
                charge_point("DE*ABC*E1", "LOC-A", "Invalidenstraße"),
                charge_point("DE*ABC*E2", "LOC-B", "Invalidenstraße"),
            ],
            &mut second,
        )
        .await;

        let collisions: Vec<_> = second
            .diagnostics_of(DiagnosticKind::IdentityCollision)
            .collect();
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].subject.as_deref(), Some("DE*ABC*E1"));
        assert_eq!(second.pools().unchanged, 1);
    }

    #[tokio::test]
    async fn later_run_cannot_rebind_stored_pool() {
        let network = InMemoryRoamingNetwork::new();
        let mut first = report();
        reconcile_charge_points(
            &network,
            &OperatorFilter::accept_all(),
            vec![charge_point("DE*ABC*E2", "LOC-B", "Invalidenstraße")],
            &mut first,
        )
        .await;

        let mut second = report();
        reconcile_charge_points(
            &network,
            &OperatorFilter::accept_all(),
            vec![charge_point("DE*ABC*E1", "LOC-A", "Invalidenstraße")],
            &mut second,
        )
        .await;

        let collisions: Vec<_> = second
            .diagnostics_of(DiagnosticKind::IdentityCollision)
            .collect();
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].subject.as_deref(), Some("DE*ABC*E1"));
        assert_eq!(second.evses().skipped, 1);
        assert_eq!(second.pools().total(), 0);

        let e1: EvseId = "DE*ABC*E1".parse().unwrap();
        assert!(network.evses().find_by_id(&e1).await.unwrap().is_none());
        let pool_id = derive(&charge_point("DE*ABC*E2", "LOC-B", "Invalidenstraße"))
            .unwrap()
            .pool
            .id;
        let pool = network.pools().find_by_id(&pool_id).await.unwrap().unwrap();
        assert_eq!(pool.location_id, "LOC-B");
    }

    #[tokio::test]
    async fn station_split_across_pools_keeps_one() {
        let network = InMemoryRoamingNetwork::new();
        let mut report = report();
        let records = vec![
            charge_point("DE*ABC*E1*1", "LOC-1", "Invalidenstraße"),
            charge_point("DE*ABC*E1*2", "LOC-2", "Chausseestraße"),
        ];
        reconcile_charge_points(&network, &OperatorFilter::accept_all(), records, &mut report)
            .await;

        assert_eq!(report.stations().created, 1);
        assert_eq!(report.evses().created, 1);
        assert_eq!(
            report
                .diagnostics_of(DiagnosticKind::IdentityCollision)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn duplicate_evse_first_record_wins() {
        let network = InMemoryRoamingNetwork::new();
        let mut report = report();
        let records = vec![
            charge_point("DE*ABC*E1", "LOC-1", "Invalidenstraße"),
            charge_point("DE*ABC*E1", "LOC-1", "Chausseestraße"),
        ];
        reconcile_charge_points(&network, &OperatorFilter::accept_all(), records, &mut report)
            .await;

        assert_eq!(report.evses().created, 1);
        assert_eq!(report.evses().skipped, 1);
        assert_eq!(report.diagnostics_of(DiagnosticKind::DuplicateEvse).count(), 1);
        let station = network
            .stations()
            .find_by_id(&"DE*ABC*E1".parse::<EvseId>().unwrap().station_id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(station.address.street, "Invalidenstraße");
    }

    #[tokio::test]
    async fn rejected_operator_is_counted_not_stored() {
        let network = InMemoryRoamingNetwork::new();
        let mut report = report();
        let filter = OperatorFilter::new([operator("DE*ABC")], []);
        let records = vec![
            charge_point("DE*ABC*E1", "LOC-1", "Invalidenstraße"),
            charge_point("DE*XYZ*E1", "LOC-9", "Invalidenstraße"),
            charge_point("DE*XYZ*E2", "LOC-9", "Invalidenstraße"),
        ];
        reconcile_charge_points(&network, &filter, records, &mut report).await;

        assert_eq!(report.rejected, 2);
        assert_eq!(report.evses().created, 1);
        assert!(!report.operators.contains_key(&operator("DE*XYZ")));
        assert_eq!(report.diagnostics_of(DiagnosticKind::OperatorRejected).count(), 1);
    }

    #[tokio::test]
    async fn changed_fields_update_in_place() {
        let network = InMemoryRoamingNetwork::new();
        let mut first = report();
        let mut record = charge_point("DE*ABC*E1", "LOC-1", "Invalidenstraße");
        reconcile_charge_points(
            &network,
            &OperatorFilter::accept_all(),
            vec![record.clone()],
            &mut first,
        )
        .await;

        record.telephone_number = Some("+49 30 1234".into());
        record.floor_level = Some("-1".into());
        let mut second = report();
        reconcile_charge_points(&network, &OperatorFilter::accept_all(), vec![record], &mut second)
            .await;

        assert_eq!(second.pools().unchanged, 1);
        assert_eq!(second.stations().updated, 1);
        assert_eq!(second.evses().updated, 1);
        assert_eq!(second.evses().created, 0);
    }

    #[tokio::test]
    async fn failing_group_does_not_stop_others() {
        let network = FailingPools::new(operator("DE*ABC"));
        let mut report = report();
        let records = vec![
            charge_point("DE*ABC*E1", "LOC-1", "Invalidenstraße"),
            charge_point("DE*XYZ*E1", "LOC-2", "Chausseestraße"),
        ];
        reconcile_charge_points(&network, &OperatorFilter::accept_all(), records, &mut report)
            .await;

        let failed: Vec<_> = report.diagnostics_of(DiagnosticKind::GroupFailed).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].operator, Some(operator("DE*ABC")));
        assert_eq!(report.operators[&operator("DE*XYZ")].evses.created, 1);
    }

    #[tokio::test]
    async fn status_updates_known_and_skips_unknown() {
        let network = InMemoryRoamingNetwork::new();
        let mut data = report();
        reconcile_charge_points(
            &network,
            &OperatorFilter::accept_all(),
            vec![charge_point("DE*ABC*E1", "LOC-1", "Invalidenstraße")],
            &mut data,
        )
        .await;

        let now = Utc::now();
        let statuses = vec![
            EvseStatus {
                evse_id: "DE*ABC*E1".parse().unwrap(),
                major: MajorStatus::Available,
                minor: Some(MinorStatus::Available),
                ttl: None,
            },
            EvseStatus {
                evse_id: "DE*ABC*E404".parse().unwrap(),
                major: MajorStatus::Available,
                minor: None,
                ttl: None,
            },
        ];
        let mut report = SyncReport::new(JobKind::PullStatus, now);
        reconcile_statuses(&network, &OperatorFilter::accept_all(), statuses, now, &mut report)
            .await;

        assert_eq!(report.statuses.updated, 1);
        assert_eq!(report.statuses.skipped, 1);
        assert_eq!(report.diagnostics_of(DiagnosticKind::UnknownEvse).count(), 1);

        let evse = network
            .evses()
            .find_by_id(&"DE*ABC*E1".parse().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(evse.status, EvseStatusType::Available);
        assert_eq!(evse.status_changed_at, Some(now));
    }

    #[tokio::test]
    async fn charging_status_collapses_to_unspecified() {
        let network = InMemoryRoamingNetwork::new();
        let mut data = report();
        reconcile_charge_points(
            &network,
            &OperatorFilter::accept_all(),
            vec![charge_point("DE*ABC*E1", "LOC-1", "Invalidenstraße")],
            &mut data,
        )
        .await;

        let now = Utc::now();
        let mut report = SyncReport::new(JobKind::PullStatus, now);
        reconcile_statuses(
            &network,
            &OperatorFilter::accept_all(),
            vec![EvseStatus {
                evse_id: "DE*ABC*E1".parse().unwrap(),
                major: MajorStatus::NotAvailable,
                minor: Some(MinorStatus::Charging),
                ttl: None,
            }],
            now,
            &mut report,
        )
        .await;

        // Freshly created EVSEs are already unspecified.
        assert_eq!(report.statuses.unchanged, 1);
    }

    #[tokio::test]
    async fn tariffs_count_created_then_unchanged() {
        use crate::protocol::types::tariff::fixtures::tariff;

        let network = InMemoryRoamingNetwork::new();
        let mut first = report();
        store_tariffs(&network, vec![tariff("T1", "0.30"), tariff("T2", "0.40")], &mut first).await;
        assert_eq!(first.tariffs.created, 2);

        let mut second = report();
        store_tariffs(&network, vec![tariff("T1", "0.30"), tariff("T2", "0.45")], &mut second).await;
        assert_eq!(second.tariffs.unchanged, 1);
        assert_eq!(second.tariffs.updated, 1);
    }

    #[tokio::test]
    async fn invalid_authorisation_is_skipped() {
        use crate::protocol::types::authorisation::fixtures::authorisation;

        let network = InMemoryRoamingNetwork::new();
        let mut report = report();
        let mut broken = authorisation("04A2B3C5", "DE-XYZ-C2");
        broken.contract_id = String::new();
        store_authorisations(
            &network,
            vec![authorisation("04A2B3C4", "DE-XYZ-C1"), broken],
            &mut report,
        )
        .await;

        assert_eq!(report.authorisations.created, 1);
        assert_eq!(report.authorisations.skipped, 1);
        assert_eq!(report.diagnostics_of(DiagnosticKind::InvalidRecord).count(), 1);
    }
}

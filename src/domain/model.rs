//! Local roaming hierarchy: operator → pool → station → EVSE

use chrono::{DateTime, NaiveTime, Utc};

use super::ids::{ChargingPoolId, ChargingStationId, EvseId, OperatorId};
use crate::support::errors::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoCoordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::Invalid {
                field: "latitude",
                reason: format!("{} is outside [-90, 90]", latitude),
            });
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::Invalid {
                field: "longitude",
                reason: format!("{} is outside [-180, 180]", longitude),
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub house_number: Option<String>,
    pub street: String,
    pub city: String,
    pub zip_code: String,
    /// ISO 3166-1 alpha-3
    pub country: String,
}

/// Local EVSE status vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EvseStatusType {
    #[default]
    Unspecified,
    Available,
    Reserved,
    Charging,
    OutOfService,
    Offline,
    Blocked,
    Unknown,
}

impl std::fmt::Display for EvseStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unspecified => write!(f, "Unspecified"),
            Self::Available => write!(f, "Available"),
            Self::Reserved => write!(f, "Reserved"),
            Self::Charging => write!(f, "Charging"),
            Self::OutOfService => write!(f, "OutOfService"),
            Self::Offline => write!(f, "Offline"),
            Self::Blocked => write!(f, "Blocked"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AuthenticationMode {
    /// Free to use, no identification
    NoAuthentication,
    LocalKey,
    RfidMifareClassic,
    RfidMifareDesfire,
    RfidCalypso,
    /// ISO 15118 plug & charge
    PlugAndCharge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PaymentOption {
    Cash,
    CreditCard,
    DebitCard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Accessibility {
    #[default]
    Unspecified,
    Public,
    /// Limited to customers, EVs or similar groups
    Restricted,
    Private,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegularHours {
    /// ISO weekday, 1 = Monday
    pub weekday: u8,
    pub begin: NaiveTime,
    pub end: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpeningTimes {
    Open24Hours,
    Regular(Vec<RegularHours>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentType {
    Ac,
    Dc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketOutlet {
    /// Plug standard as named on the wire, e.g. `IEC_62196_T2`
    pub plug: String,
    pub cable_attached: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChargingPool {
    pub id: ChargingPoolId,
    pub operator_id: OperatorId,
    /// Remote location the pool is bound to
    pub location_id: String,
    pub name: String,
    pub name_language: String,
    pub address: Address,
    pub geo: GeoCoordinate,
    pub time_zone: Option<String>,
    pub opening_times: Option<OpeningTimes>,
    pub accessibility: Accessibility,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChargingStation {
    pub id: ChargingStationId,
    pub pool_id: ChargingPoolId,
    pub description: Option<String>,
    pub address: Address,
    pub geo: GeoCoordinate,
    pub authentication_modes: Vec<AuthenticationMode>,
    pub payment_options: Vec<PaymentOption>,
    pub accessibility: Accessibility,
    pub opening_times: Option<OpeningTimes>,
    pub telephone: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evse {
    pub id: EvseId,
    pub station_id: ChargingStationId,
    pub status: EvseStatusType,
    pub status_changed_at: Option<DateTime<Utc>>,
    pub current_type: CurrentType,
    pub sockets: Vec<SocketOutlet>,
    pub max_power_kw: Option<f64>,
    pub floor_level: Option<String>,
    pub parking_slot: Option<String>,
}

/// Copies `desired` into `current` when they differ and records the field.
pub(crate) fn merge_field<T: PartialEq + Clone>(
    changed: &mut Vec<&'static str>,
    name: &'static str,
    current: &mut T,
    desired: &T,
) {
    if current != desired {
        *current = desired.clone();
        changed.push(name);
    }
}

impl ChargingPool {
    /// Apply remote-owned fields, returning the names of changed fields.
    /// `location_id` is fixed when the pool is created.
    pub fn merge_from(&mut self, remote: &ChargingPool) -> Vec<&'static str> {
        let mut changed = Vec::new();
        merge_field(&mut changed, "name", &mut self.name, &remote.name);
        merge_field(&mut changed, "name_language", &mut self.name_language, &remote.name_language);
        merge_field(&mut changed, "address", &mut self.address, &remote.address);
        merge_field(&mut changed, "geo", &mut self.geo, &remote.geo);
        merge_field(&mut changed, "time_zone", &mut self.time_zone, &remote.time_zone);
        merge_field(&mut changed, "opening_times", &mut self.opening_times, &remote.opening_times);
        merge_field(&mut changed, "accessibility", &mut self.accessibility, &remote.accessibility);
        changed
    }
}

impl ChargingStation {
    pub fn merge_from(&mut self, remote: &ChargingStation) -> Vec<&'static str> {
        let mut changed = Vec::new();
        merge_field(&mut changed, "pool_id", &mut self.pool_id, &remote.pool_id);
        merge_field(&mut changed, "description", &mut self.description, &remote.description);
        merge_field(&mut changed, "address", &mut self.address, &remote.address);
        merge_field(&mut changed, "geo", &mut self.geo, &remote.geo);
        merge_field(
            &mut changed,
            "authentication_modes",
            &mut self.authentication_modes,
            &remote.authentication_modes,
        );
        merge_field(&mut changed, "payment_options", &mut self.payment_options, &remote.payment_options);
        merge_field(&mut changed, "accessibility", &mut self.accessibility, &remote.accessibility);
        merge_field(&mut changed, "opening_times", &mut self.opening_times, &remote.opening_times);
        merge_field(&mut changed, "telephone", &mut self.telephone, &remote.telephone);
        changed
    }
}

impl Evse {
    /// Status is owned by the status job and left untouched here.
    pub fn merge_from(&mut self, remote: &Evse) -> Vec<&'static str> {
        let mut changed = Vec::new();
        merge_field(&mut changed, "station_id", &mut self.station_id, &remote.station_id);
        merge_field(&mut changed, "current_type", &mut self.current_type, &remote.current_type);
        merge_field(&mut changed, "sockets", &mut self.sockets, &remote.sockets);
        merge_field(&mut changed, "max_power_kw", &mut self.max_power_kw, &remote.max_power_kw);
        merge_field(&mut changed, "floor_level", &mut self.floor_level, &remote.floor_level);
        merge_field(&mut changed, "parking_slot", &mut self.parking_slot, &remote.parking_slot);
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station() -> ChargingStation {
        let evse: EvseId = "DE*ABC*E1".parse().unwrap();
        let operator = evse.operator_id();
        let address = Address {
            house_number: None,
            street: "Main Street".into(),
            city: "Town".into(),
            zip_code: "12345".into(),
            country: "DEU".into(),
        };
        let geo = GeoCoordinate::new(50.0, 8.0).unwrap();
        ChargingStation {
            id: evse.station_id(),
            pool_id: ChargingPoolId::derive(&operator, &address, &geo),
            description: None,
            address,
            geo,
            authentication_modes: vec![AuthenticationMode::RfidMifareClassic],
            payment_options: vec![],
            accessibility: Accessibility::Public,
            opening_times: None,
            telephone: None,
        }
    }

    #[test]
    fn geo_coordinate_range_is_checked() {
        assert!(GeoCoordinate::new(91.0, 0.0).is_err());
        assert!(GeoCoordinate::new(0.0, -181.0).is_err());
        assert!(GeoCoordinate::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn merge_reports_only_changed_fields() {
        let mut local = station();
        let mut remote = station();
        assert!(local.merge_from(&remote).is_empty());

        remote.description = Some("Behind the bakery".into());
        remote.payment_options = vec![PaymentOption::Cash];
        let changed = local.merge_from(&remote);
        assert_eq!(changed, vec!["description", "payment_options"]);
        assert_eq!(local, remote);
    }

    #[test]
    fn pool_merge_keeps_bound_location() {
        let station = station();
        let mut local = ChargingPool {
            id: station.pool_id.clone(),
            operator_id: "DE*ABC".parse().unwrap(),
            location_id: "LOC-B".into(),
            name: "Depot".into(),
            name_language: "deu".into(),
            address: station.address.clone(),
            geo: station.geo,
            time_zone: None,
            opening_times: None,
            accessibility: Accessibility::Public,
        };
        let mut remote = local.clone();
        remote.location_id = "LOC-A".into();
        remote.name = "Depot North".into();

        assert_eq!(local.merge_from(&remote), vec!["name"]);
        assert_eq!(local.location_id, "LOC-B");
    }
}

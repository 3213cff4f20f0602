//! Identifiers of the local roaming hierarchy
//!
//! EVSE ids follow the `CC*OOO*E…` scheme. Operator and station ids are
//! read off the EVSE id; pool ids are hashed from operator, address and
//! geo-coordinate so that re-importing unchanged data yields the same pool.

use std::fmt;
use std::str::FromStr;

use sha1::{Digest, Sha1};

use super::model::{Address, GeoCoordinate};
use crate::support::errors::ValidationError;

/// Hex digits of the pool hash kept in the id
const POOL_HASH_LEN: usize = 12;

/// Charging station operator, `CC*OOO`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperatorId {
    country: String,
    operator: String,
}

impl OperatorId {
    pub fn new(country: &str, operator: &str) -> Result<Self, ValidationError> {
        let country = country.trim().to_ascii_uppercase();
        let operator = operator.trim().to_ascii_uppercase();
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::Invalid {
                field: "operatorId",
                reason: format!("country code '{}' must be two letters", country),
            });
        }
        if operator.len() != 3 || !operator.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValidationError::Invalid {
                field: "operatorId",
                reason: format!("operator code '{}' must be three alphanumerics", operator),
            });
        }
        Ok(Self { country, operator })
    }

    pub fn country(&self) -> &str {
        &self.country
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}*{}", self.country, self.operator)
    }
}

impl FromStr for OperatorId {
    type Err = ValidationError;

    /// Accepts `DE*ABC`, `DEABC` and `DE-ABC`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s
            .trim()
            .chars()
            .filter(|c| *c != '*' && *c != '-')
            .collect();
        if compact.len() != 5 || !compact.is_ascii() {
            return Err(ValidationError::Invalid {
                field: "operatorId",
                reason: format!("'{}' is not an operator id", s),
            });
        }
        Self::new(&compact[..2], &compact[2..])
    }
}

/// EVSE identifier, normalized to star notation and upper case
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EvseId(String);

impl EvseId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn operator_id(&self) -> OperatorId {
        // Validated on construction, so the first two segments are well formed.
        let mut parts = self.0.split('*');
        let country = parts.next().unwrap_or_default().to_string();
        let operator = parts.next().unwrap_or_default().to_string();
        OperatorId { country, operator }
    }

    /// Station the EVSE belongs to: `E` becomes `S` and a trailing outlet
    /// suffix (`*1`) is dropped.
    pub fn station_id(&self) -> ChargingStationId {
        let parts: Vec<&str> = self.0.split('*').collect();
        let local = &parts[2..];
        let local = if local.len() > 1 {
            &local[..local.len() - 1]
        } else {
            local
        };
        let station_local = local.join("*");
        ChargingStationId(format!(
            "{}*{}*S{}",
            parts[0],
            parts[1],
            &station_local[1..]
        ))
    }
}

impl fmt::Display for EvseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EvseId {
    type Err = ValidationError;

    /// Accepts `DE*ABC*E123*1` and the compact `DEABCE1231`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().to_ascii_uppercase();
        let invalid = |reason: &str| ValidationError::Invalid {
            field: "evseId",
            reason: format!("'{}' {}", s, reason),
        };

        if !raw.is_ascii() || raw.len() > 48 {
            return Err(invalid("is not a valid EVSE id"));
        }

        let (country, operator, local) = if raw.contains('*') {
            let mut parts = raw.splitn(3, '*');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(c), Some(o), Some(l)) => (c.to_string(), o.to_string(), l.to_string()),
                _ => return Err(invalid("has fewer than three segments")),
            }
        } else if raw.len() > 6 {
            (raw[..2].to_string(), raw[2..5].to_string(), raw[5..].to_string())
        } else {
            return Err(invalid("is too short"));
        };

        OperatorId::new(&country, &operator)?;

        if !local.starts_with('E') || local.len() < 2 {
            return Err(invalid("must carry an 'E' segment after the operator"));
        }
        if local.split('*').any(|seg| seg.is_empty())
            || !local
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '*')
        {
            return Err(invalid("contains invalid characters"));
        }

        Ok(Self(format!("{}*{}*{}", country, operator, local)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChargingStationId(String);

impl ChargingStationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChargingStationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChargingPoolId(String);

impl ChargingPoolId {
    /// Stable pool identity for an operator at an address and position.
    pub fn derive(operator: &OperatorId, address: &Address, geo: &GeoCoordinate) -> Self {
        let canonical = [
            operator.to_string(),
            normalize(address.house_number.as_deref().unwrap_or_default()),
            normalize(&address.street),
            normalize(&address.zip_code),
            normalize(&address.city),
            normalize(&address.country),
            format!("{:.6}", geo.latitude),
            format!("{:.6}", geo.longitude),
        ]
        .join("|");

        let digest = Sha1::digest(canonical.as_bytes());
        let hash = hex::encode_upper(digest);
        Self(format!("{}*P{}", operator, &hash[..POOL_HASH_LEN]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChargingPoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn normalize(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

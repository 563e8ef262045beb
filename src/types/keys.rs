//! Grouping keys shared by vehicle units and aggregate summaries

use super::emissions::EmissionRow;
use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};

// ============================================================================
// Grouping Values
// ============================================================================

/// One grouping-key value carried by an emission row.
///
/// Ordering is numeric for `Int` and lexical for `Text`; rows with no value
/// for a key sort first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyValue {
    Missing,
    Int(i64),
    Text(String),
}

impl std::fmt::Display for KeyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyValue::Missing => Ok(()),
            KeyValue::Int(v) => write!(f, "{v}"),
            KeyValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for KeyValue {
    fn from(s: &str) -> Self {
        KeyValue::Text(s.to_string())
    }
}

// ============================================================================
// Aggregate Keys
// ============================================================================

/// Recognised grouping fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregateKey {
    Year,
    Month,
    Incident,
    Coabdis,
    County,
    AirDistrict,
    AirDistrictId,
    AirBasin,
    AoiIndex,
}

/// Keys used when a run names none.
pub const DEFAULT_AGGREGATE_KEYS: [AggregateKey; 2] = [AggregateKey::Year, AggregateKey::Incident];

impl AggregateKey {
    pub const ALL: [AggregateKey; 9] = [
        AggregateKey::Year,
        AggregateKey::Month,
        AggregateKey::Incident,
        AggregateKey::Coabdis,
        AggregateKey::County,
        AggregateKey::AirDistrict,
        AggregateKey::AirDistrictId,
        AggregateKey::AirBasin,
        AggregateKey::AoiIndex,
    ];

    /// Parse a key name. Case-insensitive; `_` and spaces are interchangeable.
    pub fn parse(name: &str) -> Result<Self, ConfigurationError> {
        let normalized = name
            .trim()
            .to_uppercase()
            .replace('_', " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        match normalized.as_str() {
            "YEAR" => Ok(AggregateKey::Year),
            "MONTH" => Ok(AggregateKey::Month),
            "INCIDENT" => Ok(AggregateKey::Incident),
            "COABDIS" => Ok(AggregateKey::Coabdis),
            "COUNTY" => Ok(AggregateKey::County),
            "AIR DISTRICT" | "DISTRICT" => Ok(AggregateKey::AirDistrict),
            "AIR DISTRICT ID" | "DISTRICT ID" => Ok(AggregateKey::AirDistrictId),
            "AIR BASIN" => Ok(AggregateKey::AirBasin),
            "AOI INDEX" => Ok(AggregateKey::AoiIndex),
            _ => Err(ConfigurationError::UnknownAggregateKey {
                key: name.to_string(),
                allowed: Self::ALL
                    .iter()
                    .map(|k| k.column())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    /// Output column name.
    pub fn column(self) -> &'static str {
        match self {
            AggregateKey::Year => "YEAR",
            AggregateKey::Month => "MONTH",
            AggregateKey::Incident => "INCIDENT",
            AggregateKey::Coabdis => "COABDIS",
            AggregateKey::County => "COUNTY",
            AggregateKey::AirDistrict => "AIR_DISTRICT",
            AggregateKey::AirDistrictId => "AIR_DISTRICT_ID",
            AggregateKey::AirBasin => "AIR_BASIN",
            AggregateKey::AoiIndex => "AOI_INDEX",
        }
    }

    /// Value of this key on an emission row.
    pub fn value_of(self, row: &EmissionRow) -> KeyValue {
        match self {
            AggregateKey::Year => row.year.map_or(KeyValue::Missing, |y| KeyValue::Int(i64::from(y))),
            AggregateKey::Month => row.month.map_or(KeyValue::Missing, |m| KeyValue::Int(i64::from(m))),
            AggregateKey::Incident => KeyValue::Text(row.incident_name.clone()),
            AggregateKey::Coabdis => KeyValue::Text(row.coabdis.clone()),
            AggregateKey::County => KeyValue::Text(row.county.clone()),
            AggregateKey::AirDistrict => KeyValue::Text(row.air_district.clone()),
            AggregateKey::AirDistrictId => KeyValue::Text(row.district_id.clone()),
            AggregateKey::AirBasin => KeyValue::Text(row.air_basin.clone()),
            AggregateKey::AoiIndex => row
                .aoi_index
                .map_or(KeyValue::Missing, |i| KeyValue::Int(i64::from(i))),
        }
    }
}

impl std::fmt::Display for AggregateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

/// Parse and normalise a requested key list.
///
/// - An empty list yields [`DEFAULT_AGGREGATE_KEYS`].
/// - Repeated keys collapse to their first position.
/// - `MONTH` without `YEAR` gets `YEAR` inserted right before it, so months of
///   different years never merge.
pub fn parse_aggregate_keys<S: AsRef<str>>(
    names: &[S],
) -> Result<Vec<AggregateKey>, ConfigurationError> {
    if names.is_empty() {
        return Ok(DEFAULT_AGGREGATE_KEYS.to_vec());
    }
    let mut keys: Vec<AggregateKey> = Vec::with_capacity(names.len() + 1);
    for name in names {
        let key = AggregateKey::parse(name.as_ref())?;
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    if !keys.contains(&AggregateKey::Year) {
        if let Some(pos) = keys.iter().position(|k| *k == AggregateKey::Month) {
            keys.insert(pos, AggregateKey::Year);
        }
    }
    Ok(keys)
}

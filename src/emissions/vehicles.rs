//! Vehicle estimates and vehicle emissions.
//!
//! Vehicle counts are fixed once per grouping unit before the row-wise
//! multiply. In ratio mode each unit gets `round(ratio × destroyed)`; in count
//! mode the supplied count is a single run-wide total.

use crate::error::ConfigurationError;
use crate::factors::VehicleFactorSet;
use crate::types::{
    AggregateKey, DamageCategory, EmissionTable, KeyValue, VehicleEmissionRow, VehicleEstimate,
    VehicleTable,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Vehicles per destroyed structure when a run does not say otherwise.
pub const DEFAULT_VEHICLE_RATIO: f64 = 1.44;

/// How vehicle counts are obtained. The two modes are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "UPPERCASE")]
pub enum VehicleMode {
    /// Vehicles per destroyed structure
    Ratio(f64),
    /// Total vehicles burned in the run
    Count(f64),
}

impl Default for VehicleMode {
    fn default() -> Self {
        VehicleMode::Ratio(DEFAULT_VEHICLE_RATIO)
    }
}

impl VehicleMode {
    pub fn parse(mode: &str, value: f64) -> Result<Self, ConfigurationError> {
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigurationError::NegativeValue {
                field: "vehicles.value",
                value,
            });
        }
        match mode.trim().to_uppercase().as_str() {
            "RATIO" => Ok(VehicleMode::Ratio(value)),
            "COUNT" => Ok(VehicleMode::Count(value)),
            _ => Err(ConfigurationError::UnknownChoice {
                field: "vehicles.mode",
                value: mode.to_string(),
                expected: "RATIO, COUNT".to_string(),
            }),
        }
    }

    pub fn value(self) -> f64 {
        match self {
            VehicleMode::Ratio(v) | VehicleMode::Count(v) => v,
        }
    }
}

/// Nearest integer, ties away from zero (`2.5 -> 3`, `7.2 -> 7`).
///
/// Inputs are validated non-negative upstream; anything below zero clamps to 0.
pub fn round_vehicles(estimate: f64) -> u64 {
    let rounded = estimate.round();
    if rounded <= 0.0 {
        0
    } else {
        rounded as u64
    }
}

/// Derive vehicle counts from the structure emissions table.
///
/// Ratio mode yields one estimate per distinct `unit_keys` combination in the
/// table, including units with no destroyed structures (count 0). Count mode
/// yields a single estimate with an empty unit. An empty table yields no
/// estimates in either mode.
pub fn estimate_vehicles(
    table: &EmissionTable,
    mode: VehicleMode,
    unit_keys: &[AggregateKey],
) -> Vec<VehicleEstimate> {
    if table.is_empty() {
        return Vec::new();
    }

    let estimates: Vec<VehicleEstimate> = match mode {
        VehicleMode::Ratio(ratio) => {
            let mut destroyed: BTreeMap<Vec<KeyValue>, u64> = BTreeMap::new();
            for row in &table.rows {
                let key = unit_keys.iter().map(|k| k.value_of(row)).collect();
                *destroyed.entry(key).or_default() += u64::from(row.damage == DamageCategory::Destroyed);
            }
            destroyed
                .into_iter()
                .map(|(values, n)| VehicleEstimate {
                    unit: unit_keys.iter().copied().zip(values).collect(),
                    destroyed_structures: n,
                    count: round_vehicles(ratio * n as f64),
                })
                .collect()
        }
        VehicleMode::Count(total) => vec![VehicleEstimate {
            unit: Vec::new(),
            destroyed_structures: table
                .rows
                .iter()
                .filter(|r| r.damage == DamageCategory::Destroyed)
                .count() as u64,
            count: round_vehicles(total),
        }],
    };

    info!(
        mode = ?mode,
        units = estimates.len(),
        vehicles = estimates.iter().map(|e| e.count).sum::<u64>(),
        "Vehicle counts estimated"
    );
    estimates
}

/// Multiply each unit's vehicle count by grams-per-vehicle.
pub fn compute_vehicle_emissions(
    estimates: &[VehicleEstimate],
    factors: &VehicleFactorSet,
) -> VehicleTable {
    let rows = estimates
        .iter()
        .map(|e| VehicleEmissionRow {
            unit: e.unit.clone(),
            destroyed_structures: e.destroyed_structures,
            vehicles: e.count,
            emissions_g: factors
                .grams_per_vehicle()
                .iter()
                .map(|g| e.count as f64 * g)
                .collect(),
        })
        .collect();

    VehicleTable {
        pollutants: factors.pollutants().to_vec(),
        grams_per_vehicle: factors.grams_per_vehicle().to_vec(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors::{resolve_vehicle_factors, VehicleFactorRequest};
    use crate::types::EmissionRow;

    fn row(incident: &str, damage: DamageCategory) -> EmissionRow {
        EmissionRow {
            structure_id: format!("{incident}-{damage:?}"),
            incident_name: incident.to_string(),
            incident_number: String::new(),
            year: Some(2020),
            month: Some(9),
            county: "NAPA".to_string(),
            air_basin: String::new(),
            air_district: String::new(),
            district_id: String::new(),
            coabdis: String::new(),
            aoi_index: None,
            damage,
            category: None,
            location: None,
            floor_area: None,
            consumption_fraction: 0.0,
            frame_factor: 1.0,
            contents_factor: 1.0,
            consumed_fuel_kg: 0.0,
            emissions_g: vec![],
        }
    }

    fn table(rows: Vec<EmissionRow>) -> EmissionTable {
        EmissionTable {
            pollutants: vec![],
            rows,
        }
    }

    #[test]
    fn test_ratio_rounds_ties_away_from_zero() {
        let rows = (0..5).map(|_| row("GLASS", DamageCategory::Destroyed)).collect();
        let est = estimate_vehicles(&table(rows), VehicleMode::Ratio(1.44), &[AggregateKey::Incident]);
        assert_eq!(est.len(), 1);
        assert_eq!(est[0].destroyed_structures, 5);
        assert_eq!(est[0].count, 7);
    }

    #[test]
    fn test_round_vehicles_policy() {
        assert_eq!(round_vehicles(7.2), 7);
        assert_eq!(round_vehicles(2.5), 3);
        assert_eq!(round_vehicles(0.5), 1);
        assert_eq!(round_vehicles(0.49), 0);
        assert_eq!(round_vehicles(-1.0), 0);
    }

    #[test]
    fn test_ratio_counts_destroyed_only_per_unit() {
        let rows = vec![
            row("GLASS", DamageCategory::Destroyed),
            row("GLASS", DamageCategory::Major),
            row("LNU", DamageCategory::Destroyed),
            row("LNU", DamageCategory::Destroyed),
            row("ZOGG", DamageCategory::Minor),
        ];
        let est = estimate_vehicles(&table(rows), VehicleMode::Ratio(1.0), &[AggregateKey::Incident]);
        let counts: Vec<_> = est
            .iter()
            .map(|e| (e.unit[0].1.to_string(), e.destroyed_structures, e.count))
            .collect();
        assert_eq!(
            counts,
            vec![
                ("GLASS".to_string(), 1, 1),
                ("LNU".to_string(), 2, 2),
                ("ZOGG".to_string(), 0, 0),
            ]
        );
    }

    #[test]
    fn test_count_mode_single_unit() {
        let rows = vec![
            row("GLASS", DamageCategory::Destroyed),
            row("LNU", DamageCategory::Destroyed),
        ];
        let est = estimate_vehicles(&table(rows), VehicleMode::Count(12.0), &[AggregateKey::Incident]);
        assert_eq!(est.len(), 1);
        assert!(est[0].unit.is_empty());
        assert_eq!(est[0].count, 12);
        assert_eq!(est[0].destroyed_structures, 2);
    }

    #[test]
    fn test_empty_table_no_estimates() {
        assert!(estimate_vehicles(&table(vec![]), VehicleMode::Count(3.0), &[]).is_empty());
        assert!(estimate_vehicles(&table(vec![]), VehicleMode::default(), &[]).is_empty());
    }

    #[test]
    fn test_vehicle_emissions_multiply() {
        let factors = resolve_vehicle_factors(&VehicleFactorRequest::default()).unwrap();
        let est = vec![VehicleEstimate {
            unit: vec![(AggregateKey::Incident, KeyValue::from("GLASS"))],
            destroyed_structures: 5,
            count: 7,
        }];
        let out = compute_vehicle_emissions(&est, &factors);
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.total_vehicles(), 7);
        for (g, per) in out.rows[0].emissions_g.iter().zip(factors.grams_per_vehicle()) {
            assert_eq!(*g, 7.0 * per);
        }
        assert_eq!(out.rows[0].unit_value(AggregateKey::Incident), KeyValue::from("GLASS"));
        assert_eq!(out.rows[0].unit_value(AggregateKey::Year), KeyValue::Missing);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(VehicleMode::parse("ratio", 1.44).unwrap(), VehicleMode::Ratio(1.44));
        assert_eq!(VehicleMode::parse("COUNT", 0.0).unwrap(), VehicleMode::Count(0.0));
        assert!(matches!(
            VehicleMode::parse("RATIO", -1.0),
            Err(ConfigurationError::NegativeValue { .. })
        ));
        assert!(VehicleMode::parse("PER_ACRE", 1.0).is_err());
    }
}

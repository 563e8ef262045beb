//! Emissions outputs: per-structure rows, vehicle rows and aggregate rows

use super::keys::{AggregateKey, KeyValue};
use super::structure::{DamageCategory, Location};
use serde::{Deserialize, Serialize};

// ============================================================================
// Per-Structure Emissions
// ============================================================================

/// Emissions computed for one structure.
///
/// `emissions_g[i]` is the emitted mass in grams of pollutant
/// `EmissionTable::pollutants[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionRow {
    pub structure_id: String,
    pub incident_name: String,
    pub incident_number: String,
    /// From the incident date; `None` for undated records
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub county: String,
    pub air_basin: String,
    pub air_district: String,
    pub district_id: String,
    pub coabdis: String,
    pub aoi_index: Option<u32>,
    pub damage: DamageCategory,
    pub category: Option<String>,
    pub location: Option<Location>,
    pub floor_area: Option<f64>,
    pub consumption_fraction: f64,
    pub frame_factor: f64,
    pub contents_factor: f64,
    /// Fuel mass consumed (kg)
    pub consumed_fuel_kg: f64,
    pub emissions_g: Vec<f64>,
}

/// Detailed emissions output: one row per surviving input structure.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EmissionTable {
    pub pollutants: Vec<String>,
    pub rows: Vec<EmissionRow>,
}

impl EmissionTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column total for one pollutant (grams).
    pub fn total(&self, pollutant: &str) -> Option<f64> {
        let idx = self.pollutants.iter().position(|p| p == pollutant)?;
        Some(self.rows.iter().map(|r| r.emissions_g[idx]).sum())
    }
}

// ============================================================================
// Vehicles
// ============================================================================

/// Estimated vehicle count for one grouping unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleEstimate {
    /// Key values identifying the unit (empty for a run-wide count)
    pub unit: Vec<(AggregateKey, KeyValue)>,
    /// Destroyed structures in the unit (ratio basis)
    pub destroyed_structures: u64,
    pub count: u64,
}

/// Vehicle emissions for one grouping unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleEmissionRow {
    pub unit: Vec<(AggregateKey, KeyValue)>,
    pub destroyed_structures: u64,
    pub vehicles: u64,
    pub emissions_g: Vec<f64>,
}

impl VehicleEmissionRow {
    pub fn unit_value(&self, key: AggregateKey) -> KeyValue {
        self.unit
            .iter()
            .find(|(k, _)| *k == key)
            .map_or(KeyValue::Missing, |(_, v)| v.clone())
    }
}

/// Per-unit vehicle emissions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VehicleTable {
    pub pollutants: Vec<String>,
    /// Grams emitted per burned vehicle, parallel to `pollutants`
    pub grams_per_vehicle: Vec<f64>,
    pub rows: Vec<VehicleEmissionRow>,
}

impl VehicleTable {
    pub fn total_vehicles(&self) -> u64 {
        self.rows.iter().map(|r| r.vehicles).sum()
    }
}

// ============================================================================
// Aggregates
// ============================================================================

/// Summed emissions for one grouping-key combination.
///
/// For structure summaries `count` is the number of structures in the group
/// and `damaged` those with a non-zero consumption fraction. For vehicle
/// summaries `count` is vehicles and `damaged` destroyed structures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub keys: Vec<KeyValue>,
    pub count: u64,
    pub damaged: u64,
    pub totals_g: Vec<f64>,
}

/// Grouped summary table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregateTable {
    /// Grouping keys, in row-key order
    pub keys: Vec<AggregateKey>,
    pub pollutants: Vec<String>,
    pub rows: Vec<AggregateRow>,
}

impl AggregateTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total(&self, pollutant: &str) -> Option<f64> {
        let idx = self.pollutants.iter().position(|p| p == pollutant)?;
        Some(self.rows.iter().map(|r| r.totals_g[idx]).sum())
    }
}

// ============================================================================
// Exclusions
// ============================================================================

/// A row dropped from the run because it failed a data check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exclusion {
    pub record_id: String,
    pub reason: String,
}

/// Rows excluded during computation, returned alongside the outputs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExclusionReport {
    pub total_input: usize,
    pub excluded: Vec<Exclusion>,
}

impl ExclusionReport {
    pub fn count(&self) -> usize {
        self.excluded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.excluded.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.excluded.iter().map(|e| e.record_id.as_str())
    }
}

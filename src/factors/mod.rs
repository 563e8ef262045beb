//! Factor Resolver
//!
//! Turns a run's symbolic or numeric factor choices into flat, immutable
//! factor sets. Resolution happens once per run, before any row is touched;
//! every row computation then reads the same `FactorSet` by reference.
//!
//! Structures and vehicles resolve independently: a run may use HOLDER
//! factors for structures, CARB for vehicles, each with its own pollutant
//! selection and optional custom table.

pub mod builtin;
mod table;

pub use table::{EmissionFactorTable, PollutantSelection, TableKind};

use crate::consumption::ConsumptionPolicy;
use crate::error::ConfigurationError;
use builtin::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

// ============================================================================
// Choices
// ============================================================================

/// Source of an emission-factor table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmissionFactorChoice {
    Holder,
    Carb,
    /// User CSV table
    Custom(PathBuf),
}

impl EmissionFactorChoice {
    /// Resolve a choice name. `CUSTOM` (or the legacy `OTHER`) requires a path.
    pub fn parse(
        name: &str,
        custom_table: Option<PathBuf>,
        field: &'static str,
    ) -> Result<Self, ConfigurationError> {
        match name.trim().to_uppercase().as_str() {
            "HOLDER" => Ok(EmissionFactorChoice::Holder),
            "CARB" => Ok(EmissionFactorChoice::Carb),
            "CUSTOM" | "OTHER" => custom_table
                .map(EmissionFactorChoice::Custom)
                .ok_or(ConfigurationError::MissingCustomTable { field }),
            _ => Err(ConfigurationError::UnknownChoice {
                field,
                value: name.to_string(),
                expected: "HOLDER, CARB, CUSTOM".to_string(),
            }),
        }
    }
}

/// A fuel-load scalar: named built-in or direct value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarChoice {
    Holder,
    Carb,
    Value(f64),
}

impl ScalarChoice {
    pub fn parse_name(name: &str, field: &'static str) -> Result<Self, ConfigurationError> {
        match name.trim().to_uppercase().as_str() {
            "HOLDER" => Ok(ScalarChoice::Holder),
            "CARB" => Ok(ScalarChoice::Carb),
            other => match other.parse::<f64>() {
                Ok(v) => Self::value(v, field),
                Err(_) => Err(ConfigurationError::UnknownChoice {
                    field,
                    value: name.to_string(),
                    expected: "HOLDER, CARB or a positive number".to_string(),
                }),
            },
        }
    }

    /// Direct value; must be positive and finite.
    pub fn value(v: f64, field: &'static str) -> Result<Self, ConfigurationError> {
        if v.is_finite() && v > 0.0 {
            Ok(ScalarChoice::Value(v))
        } else {
            Err(ConfigurationError::NonPositiveValue { field, value: v })
        }
    }
}

/// How structure fuel mass is derived from the frame and contents factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelLoadBasis {
    /// Factors are fuel mass per structure
    PerStructure,
    /// Factors are fuel mass per unit floor area
    #[default]
    FloorArea,
}

impl FuelLoadBasis {
    pub fn parse(name: &str) -> Result<Self, ConfigurationError> {
        match name.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "per_structure" | "structure" => Ok(FuelLoadBasis::PerStructure),
            "floor_area" | "area" | "sqft" => Ok(FuelLoadBasis::FloorArea),
            _ => Err(ConfigurationError::UnknownChoice {
                field: "fuel_load_basis",
                value: name.to_string(),
                expected: "per_structure, floor_area".to_string(),
            }),
        }
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Everything the resolver needs for the structure factor set.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureFactorRequest {
    pub emission_factors: EmissionFactorChoice,
    pub frame: ScalarChoice,
    pub contents: ScalarChoice,
    pub consumption: ConsumptionPolicy,
    pub basis: FuelLoadBasis,
    pub default_floor_area: Option<f64>,
    pub pollutants: PollutantSelection,
}

impl Default for StructureFactorRequest {
    fn default() -> Self {
        Self {
            emission_factors: EmissionFactorChoice::Holder,
            frame: ScalarChoice::Holder,
            contents: ScalarChoice::Holder,
            consumption: ConsumptionPolicy::Dins3,
            basis: FuelLoadBasis::FloorArea,
            default_floor_area: None,
            pollutants: PollutantSelection::Default,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleFactorRequest {
    pub emission_factors: EmissionFactorChoice,
    pub pollutants: PollutantSelection,
}

impl Default for VehicleFactorRequest {
    fn default() -> Self {
        Self {
            emission_factors: EmissionFactorChoice::Carb,
            pollutants: PollutantSelection::Default,
        }
    }
}

// ============================================================================
// Resolved Sets
// ============================================================================

/// Resolved structure factors for one run. Immutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorSet {
    source: String,
    pollutants: Vec<String>,
    /// Grams emitted per kg fuel consumed, parallel to `pollutants`
    emission_factors: Vec<f64>,
    frame_factor: f64,
    contents_factor: f64,
    /// Parcel category -> contents factor replacing the scalar
    contents_overrides: BTreeMap<String, f64>,
    consumption: ConsumptionPolicy,
    basis: FuelLoadBasis,
    default_floor_area: Option<f64>,
}

impl FactorSet {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn pollutants(&self) -> &[String] {
        &self.pollutants
    }

    pub fn emission_factors(&self) -> &[f64] {
        &self.emission_factors
    }

    pub fn emission_factor(&self, pollutant: &str) -> Option<f64> {
        self.pollutants
            .iter()
            .position(|p| p == pollutant)
            .map(|i| self.emission_factors[i])
    }

    pub fn frame_factor(&self) -> f64 {
        self.frame_factor
    }

    /// Contents factor for a parcel category, falling back to the scalar.
    pub fn contents_factor(&self, category: Option<&str>) -> f64 {
        category
            .and_then(|c| self.contents_overrides.get(&c.trim().to_uppercase()))
            .copied()
            .unwrap_or(self.contents_factor)
    }

    pub fn consumption(&self) -> ConsumptionPolicy {
        self.consumption
    }

    pub fn basis(&self) -> FuelLoadBasis {
        self.basis
    }

    pub fn default_floor_area(&self) -> Option<f64> {
        self.default_floor_area
    }
}

/// Resolved vehicle factors: grams emitted per burned vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleFactorSet {
    source: String,
    pollutants: Vec<String>,
    grams_per_vehicle: Vec<f64>,
}

impl VehicleFactorSet {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn pollutants(&self) -> &[String] {
        &self.pollutants
    }

    pub fn grams_per_vehicle(&self) -> &[f64] {
        &self.grams_per_vehicle
    }
}

// ============================================================================
// Resolution
// ============================================================================

fn load_table(
    choice: &EmissionFactorChoice,
    kind: TableKind,
) -> Result<EmissionFactorTable, ConfigurationError> {
    Ok(match (choice, kind) {
        (EmissionFactorChoice::Holder, TableKind::Structure) => {
            EmissionFactorTable::from_static("HOLDER", HOLDER_STRUCTURE_EFS)
        }
        (EmissionFactorChoice::Carb, TableKind::Structure) => {
            EmissionFactorTable::from_static("CARB", CARB_STRUCTURE_EFS)
        }
        (EmissionFactorChoice::Holder, TableKind::Vehicle) => {
            EmissionFactorTable::from_static("HOLDER", HOLDER_VEHICLE_EFS).scaled(VEHICLE_FUEL_MASS_KG)
        }
        (EmissionFactorChoice::Carb, TableKind::Vehicle) => {
            EmissionFactorTable::from_static("CARB", CARB_VEHICLE_EFS).scaled(VEHICLE_FUEL_MASS_KG)
        }
        (EmissionFactorChoice::Custom(path), kind) => EmissionFactorTable::load_csv(path, kind)?,
    })
}

/// Custom tables carry their own pollutant list, so "no selection" means all.
fn effective_selection(
    choice: &EmissionFactorChoice,
    selection: &PollutantSelection,
) -> PollutantSelection {
    match (choice, selection) {
        (EmissionFactorChoice::Custom(_), PollutantSelection::Default) => PollutantSelection::All,
        _ => selection.clone(),
    }
}

/// Build the run's structure `FactorSet`.
pub fn resolve_structure_factors(
    request: &StructureFactorRequest,
) -> Result<FactorSet, ConfigurationError> {
    let table = load_table(&request.emission_factors, TableKind::Structure)?;
    let selection = effective_selection(&request.emission_factors, &request.pollutants);
    let (pollutants, emission_factors) = table.select(&selection, &DEFAULT_STRUCTURE_POLLUTANTS)?;

    let frame_factor = match request.frame {
        ScalarChoice::Holder => HOLDER_FRAME_FACTOR,
        ScalarChoice::Carb => CARB_FRAME_FACTOR,
        ScalarChoice::Value(v) => positive(v, "frame_factor")?,
    };

    let mut contents_overrides = BTreeMap::new();
    let contents_factor = match request.contents {
        ScalarChoice::Holder => HOLDER_CONTENTS_FACTOR,
        ScalarChoice::Carb => {
            for cat in CARB_NONRESIDENTIAL_CATEGORIES {
                contents_overrides.insert(cat.to_string(), CARB_CONTENTS_FACTOR_NONRESIDENTIAL);
            }
            CARB_CONTENTS_FACTOR
        }
        ScalarChoice::Value(v) => positive(v, "contents_factor")?,
    };

    let default_floor_area = request
        .default_floor_area
        .map(|a| positive(a, "default_floor_area"))
        .transpose()?;

    info!(
        table = %table.name,
        ?pollutants,
        frame_factor,
        contents_factor,
        consumption = %request.consumption,
        basis = ?request.basis,
        "Resolved structure factors"
    );

    Ok(FactorSet {
        source: table.name,
        pollutants,
        emission_factors,
        frame_factor,
        contents_factor,
        contents_overrides,
        consumption: request.consumption,
        basis: request.basis,
        default_floor_area,
    })
}

/// Build the run's vehicle factor set.
pub fn resolve_vehicle_factors(
    request: &VehicleFactorRequest,
) -> Result<VehicleFactorSet, ConfigurationError> {
    let table = load_table(&request.emission_factors, TableKind::Vehicle)?;
    let selection = effective_selection(&request.emission_factors, &request.pollutants);
    let (pollutants, grams_per_vehicle) = table.select(&selection, &DEFAULT_VEHICLE_POLLUTANTS)?;

    info!(table = %table.name, ?pollutants, "Resolved vehicle factors");

    Ok(VehicleFactorSet {
        source: table.name,
        pollutants,
        grams_per_vehicle,
    })
}

fn positive(v: f64, field: &'static str) -> Result<f64, ConfigurationError> {
    if v.is_finite() && v > 0.0 {
        Ok(v)
    } else {
        Err(ConfigurationError::NonPositiveValue { field, value: v })
    }
}

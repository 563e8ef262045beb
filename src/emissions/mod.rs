//! Emissions Calculator
//!
//! Row-wise transform from `StructureRecord` to `EmissionRow`:
//!
//! ```text
//! consumed_kg   = fraction × fuel_load
//! fuel_load     = frame + contents                         (per_structure)
//!               = area_ft2 × (frame + contents) × lb→kg    (floor_area)
//! emitted_g[p]  = consumed_kg × EF[p]
//! ```
//!
//! Rows are independent, so they are computed with a rayon parallel iterator;
//! the ordered `collect` keeps output order equal to input order. Rows failing
//! a data check are excluded and reported, never silently dropped. A zero
//! consumption fraction still yields a row (all-zero emissions).

pub mod vehicles;

pub use vehicles::{
    compute_vehicle_emissions, estimate_vehicles, round_vehicles, VehicleMode, DEFAULT_VEHICLE_RATIO,
};

use crate::error::{ComputationError, DataValidationError, SweepError};
use crate::factors::builtin::POUND_KG;
use crate::factors::{FactorSet, FuelLoadBasis};
use crate::types::{EmissionRow, EmissionTable, Exclusion, ExclusionReport, StructureRecord};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Exclusions logged individually before the log switches to a summary.
const MAX_LOGGED_EXCLUSIONS: usize = 10;

/// Per-structure emissions plus the rows that were excluded on the way.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructureEmissions {
    pub table: EmissionTable,
    pub exclusions: ExclusionReport,
}

/// Compute the detailed emissions table for a filtered structure table.
///
/// Empty input gives an empty table. Input where every row fails data
/// validation is a run-level `DataValidationError::NothingSurvived`. A
/// `ComputationError` on any row aborts the run.
pub fn compute_structure_emissions(
    records: &[StructureRecord],
    factors: &FactorSet,
) -> Result<StructureEmissions, SweepError> {
    check_factor_set(factors)?;

    let outcomes: Vec<Result<EmissionRow, SweepError>> = records
        .par_iter()
        .map(|record| compute_row(record, factors))
        .collect();

    let mut rows = Vec::with_capacity(records.len());
    let mut excluded = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(row) => rows.push(row),
            Err(SweepError::DataValidation(err)) => {
                if excluded.len() < MAX_LOGGED_EXCLUSIONS {
                    warn!(error = %err, "Excluding record");
                }
                excluded.push(Exclusion {
                    record_id: err.record_id().unwrap_or_default().to_string(),
                    reason: err.to_string(),
                });
            }
            Err(other) => return Err(other),
        }
    }

    if excluded.len() > MAX_LOGGED_EXCLUSIONS {
        warn!(
            suppressed = excluded.len() - MAX_LOGGED_EXCLUSIONS,
            "Further exclusions not logged individually"
        );
    }

    if !records.is_empty() && rows.is_empty() {
        return Err(DataValidationError::NothingSurvived {
            total: records.len(),
        }
        .into());
    }

    info!(
        records = records.len(),
        rows = rows.len(),
        excluded = excluded.len(),
        pollutants = ?factors.pollutants(),
        "Structure emissions computed"
    );

    Ok(StructureEmissions {
        table: EmissionTable {
            pollutants: factors.pollutants().to_vec(),
            rows,
        },
        exclusions: ExclusionReport {
            total_input: records.len(),
            excluded,
        },
    })
}

/// Every selected pollutant must carry a factor.
fn check_factor_set(factors: &FactorSet) -> Result<(), ComputationError> {
    let efs = factors.emission_factors();
    match factors.pollutants().get(efs.len()) {
        Some(pollutant) => Err(ComputationError::MissingFactor {
            pollutant: pollutant.clone(),
        }),
        None => Ok(()),
    }
}

/// Fuel mass available to burn in one structure (kg).
fn fuel_load_kg(record: &StructureRecord, factors: &FactorSet) -> Result<f64, DataValidationError> {
    let per_unit = factors.frame_factor() + factors.contents_factor(record.category.as_deref());
    match factors.basis() {
        FuelLoadBasis::PerStructure => Ok(per_unit),
        FuelLoadBasis::FloorArea => {
            let area = floor_area(record, factors.default_floor_area())?;
            Ok(area * per_unit * POUND_KG)
        }
    }
}

/// Record floor area, or the run default when the record carries none.
fn floor_area(record: &StructureRecord, default: Option<f64>) -> Result<f64, DataValidationError> {
    match record.floor_area {
        Some(area) if area.is_finite() && area >= 0.0 => Ok(area),
        Some(area) => Err(DataValidationError::OutOfRange {
            record_id: record.id.clone(),
            field: "floor_area",
            value: area,
            expected: "finite, >= 0 ft²",
        }),
        None => default.ok_or_else(|| DataValidationError::MissingField {
            record_id: record.id.clone(),
            field: "floor_area",
        }),
    }
}

fn compute_row(record: &StructureRecord, factors: &FactorSet) -> Result<EmissionRow, SweepError> {
    let (damage, fraction) = factors.consumption().apply(record)?;

    // Nothing burned: the fuel load is irrelevant, so a missing area is fine
    let consumed_fuel_kg = if fraction > 0.0 {
        fraction * fuel_load_kg(record, factors)?
    } else {
        0.0
    };

    let mut emissions_g = Vec::with_capacity(factors.pollutants().len());
    for (pollutant, ef) in factors.pollutants().iter().zip(factors.emission_factors()) {
        let grams = consumed_fuel_kg * ef;
        if !grams.is_finite() {
            return Err(ComputationError::NonFinite {
                record_id: record.id.clone(),
                pollutant: pollutant.clone(),
                value: grams,
            }
            .into());
        }
        emissions_g.push(grams);
    }

    debug!(record = %record.id, %damage, fraction, consumed_fuel_kg, "Row computed");

    Ok(EmissionRow {
        structure_id: record.id.clone(),
        incident_name: record.incident_name.clone(),
        incident_number: record.incident_number.clone(),
        year: record.year(),
        month: record.month(),
        county: record.county.clone(),
        air_basin: record.air_basin.clone(),
        air_district: record.air_district.clone(),
        district_id: record.district_id.clone(),
        coabdis: record.coabdis.clone(),
        aoi_index: record.aoi_index,
        damage,
        category: record.category.clone(),
        location: record.location,
        floor_area: record.floor_area,
        consumption_fraction: fraction,
        frame_factor: factors.frame_factor(),
        contents_factor: factors.contents_factor(record.category.as_deref()),
        consumed_fuel_kg,
        emissions_g,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumption::ConsumptionPolicy;
    use crate::factors::{
        resolve_structure_factors, EmissionFactorChoice, PollutantSelection, ScalarChoice,
        StructureFactorRequest,
    };
    use chrono::NaiveDate;
    use std::io::Write;

    fn record(id: &str, damage: &str) -> StructureRecord {
        StructureRecord {
            id: id.to_string(),
            incident_name: "CAMP".to_string(),
            incident_date: NaiveDate::from_ymd_opt(2018, 11, 8),
            damage: Some(damage.to_string()),
            county: "BUTTE".to_string(),
            floor_area: Some(1500.0),
            ..Default::default()
        }
    }

    /// Per-structure basis, frame + contents = 10 kg, CO = 50 g/kg.
    fn ten_kg_factors(policy: ConsumptionPolicy) -> (tempfile::NamedTempFile, FactorSet) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "POLLUTANT,STRUCTURE_GKG\nCO,50\nPM,2").unwrap();
        let req = StructureFactorRequest {
            emission_factors: EmissionFactorChoice::Custom(file.path().to_path_buf()),
            frame: ScalarChoice::Value(6.0),
            contents: ScalarChoice::Value(4.0),
            consumption: policy,
            basis: FuelLoadBasis::PerStructure,
            default_floor_area: None,
            pollutants: PollutantSelection::List(vec!["co".to_string()]),
        };
        let set = resolve_structure_factors(&req).unwrap();
        (file, set)
    }

    #[test]
    fn test_destroyed_holder_scenario() {
        let (_file, factors) = ten_kg_factors(ConsumptionPolicy::Holder);
        let out = compute_structure_emissions(&[record("S-1", "Destroyed (>50%)")], &factors).unwrap();
        assert_eq!(out.table.pollutants, ["CO"]);
        let row = &out.table.rows[0];
        assert!((row.consumed_fuel_kg - 8.0).abs() < 1e-9);
        assert!((row.emissions_g[0] - 400.0).abs() < 1e-9);
        assert!(out.exclusions.is_empty());
    }

    #[test]
    fn test_zero_fraction_row_kept() {
        let (_file, factors) = ten_kg_factors(ConsumptionPolicy::Dins3);
        let out = compute_structure_emissions(&[record("S-1", "Minor (10-25%)")], &factors).unwrap();
        assert_eq!(out.table.rows.len(), 1);
        assert_eq!(out.table.rows[0].consumption_fraction, 0.0);
        assert_eq!(out.table.rows[0].emissions_g, vec![0.0]);
    }

    #[test]
    fn test_floor_area_basis_scales_by_area() {
        let req = StructureFactorRequest {
            consumption: ConsumptionPolicy::Holder,
            ..Default::default()
        };
        let factors = resolve_structure_factors(&req).unwrap();
        let out = compute_structure_emissions(&[record("S-1", "destroyed")], &factors).unwrap();
        let row = &out.table.rows[0];
        let expected_kg =
            0.8 * 1500.0 * (factors.frame_factor() + factors.contents_factor(None)) * POUND_KG;
        assert!((row.consumed_fuel_kg - expected_kg).abs() < 1e-6);
        let co = factors.emission_factor("CO").unwrap();
        assert!((row.emissions_g[0] - expected_kg * co).abs() < 1e-6);
    }

    #[test]
    fn test_floor_area_default_and_missing() {
        let mut no_area = record("S-2", "destroyed");
        no_area.floor_area = None;

        let factors = resolve_structure_factors(&StructureFactorRequest::default()).unwrap();
        let out = compute_structure_emissions(&[record("S-1", "destroyed"), no_area.clone()], &factors)
            .unwrap();
        assert_eq!(out.table.rows.len(), 1);
        assert_eq!(out.exclusions.ids().collect::<Vec<_>>(), ["S-2"]);

        let req = StructureFactorRequest {
            default_floor_area: Some(1200.0),
            ..Default::default()
        };
        let factors = resolve_structure_factors(&req).unwrap();
        let out = compute_structure_emissions(&[no_area], &factors).unwrap();
        assert_eq!(out.table.rows.len(), 1);
        assert!(out.table.rows[0].consumed_fuel_kg > 0.0);
    }

    #[test]
    fn test_invalid_rows_excluded_with_ids() {
        let (_file, factors) = ten_kg_factors(ConsumptionPolicy::Dins3);
        let mut blank = record("S-3", "");
        blank.damage = None;
        let records = vec![record("S-1", "destroyed"), record("S-2", "Inaccessible"), blank];
        let out = compute_structure_emissions(&records, &factors).unwrap();
        assert_eq!(out.table.rows.len(), 1);
        assert_eq!(out.exclusions.total_input, 3);
        assert_eq!(out.exclusions.ids().collect::<Vec<_>>(), ["S-2", "S-3"]);
        assert!(out.exclusions.excluded[0].reason.contains("Inaccessible"));
    }

    #[test]
    fn test_undated_record_kept_without_year() {
        let (_file, factors) = ten_kg_factors(ConsumptionPolicy::Dins3);
        let mut undated = record("S-1", "destroyed");
        undated.incident_date = None;
        let out = compute_structure_emissions(&[undated], &factors).unwrap();
        assert!(out.exclusions.is_empty());
        let row = &out.table.rows[0];
        assert_eq!((row.year, row.month), (None, None));
        assert!(row.emissions_g[0] > 0.0);
    }

    #[test]
    fn test_unburned_rows_need_no_floor_area() {
        // default basis is floor_area with no default area
        let factors = resolve_structure_factors(&StructureFactorRequest::default()).unwrap();
        let mut untouched = record("S-1", "No Damage");
        untouched.floor_area = None;
        let mut minor = record("S-2", "Minor (10-25%)");
        minor.floor_area = None;

        let out = compute_structure_emissions(&[untouched, minor], &factors).unwrap();
        assert!(out.exclusions.is_empty());
        assert_eq!(out.table.rows.len(), 2);
        for row in &out.table.rows {
            assert_eq!(row.consumption_fraction, 0.0);
            assert_eq!(row.consumed_fuel_kg, 0.0);
            assert!(row.emissions_g.iter().all(|g| *g == 0.0));
        }
    }

    #[test]
    fn test_nothing_survives_is_error() {
        let (_file, factors) = ten_kg_factors(ConsumptionPolicy::Dins3);
        let err = compute_structure_emissions(&[record("S-1", "melted")], &factors).unwrap_err();
        assert!(matches!(
            err,
            SweepError::DataValidation(DataValidationError::NothingSurvived { total: 1 })
        ));
    }

    #[test]
    fn test_empty_input_empty_table() {
        let (_file, factors) = ten_kg_factors(ConsumptionPolicy::Dins3);
        let out = compute_structure_emissions(&[], &factors).unwrap();
        assert!(out.table.is_empty());
        assert_eq!(out.table.pollutants, ["CO"]);
        assert_eq!(out.exclusions.total_input, 0);
    }

    #[test]
    fn test_row_order_matches_input() {
        let (_file, factors) = ten_kg_factors(ConsumptionPolicy::Dins5);
        let records: Vec<_> = (0..500)
            .map(|i| record(&format!("S-{i}"), if i % 2 == 0 { "major" } else { "affected" }))
            .collect();
        let out = compute_structure_emissions(&records, &factors).unwrap();
        let ids: Vec<_> = out.table.rows.iter().map(|r| r.structure_id.clone()).collect();
        let expected: Vec<_> = records.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_negative_floor_area_excluded() {
        let factors = resolve_structure_factors(&StructureFactorRequest::default()).unwrap();
        let mut bad = record("S-9", "destroyed");
        bad.floor_area = Some(-10.0);
        let out = compute_structure_emissions(&[record("S-1", "destroyed"), bad], &factors).unwrap();
        assert_eq!(out.exclusions.count(), 1);
        assert!(out.exclusions.excluded[0].reason.contains("floor_area"));
    }
}

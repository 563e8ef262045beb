//! Report writing
//!
//! Serialises a run's tables into a run directory:
//!
//! ```text
//! <out>/SWEEP_<suffix>/
//!   Emissions_Report.csv        one row per structure
//!   Aggregated_Report.csv       grouped structure totals
//!   Vehicle_Report.csv          per-unit vehicle totals
//!   Emissions_Spatial.geojson   structure points with emissions
//!   Exclusions.csv              rows dropped by data checks
//! ```
//!
//! File contents never carry timestamps; the same run writes the same bytes.

use crate::pipeline::RunOutput;
use crate::tabular::csv_join;
use crate::types::{AggregateTable, EmissionRow, EmissionTable, ExclusionReport};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const EMISSIONS_REPORT: &str = "Emissions_Report.csv";
pub const AGGREGATED_REPORT: &str = "Aggregated_Report.csv";
pub const VEHICLE_REPORT: &str = "Vehicle_Report.csv";
pub const SPATIAL_REPORT: &str = "Emissions_Spatial.geojson";
pub const EXCLUSIONS_REPORT: &str = "Exclusions.csv";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode GeoJSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Output column for a pollutant's emitted mass.
pub fn pollutant_column(pollutant: &str) -> String {
    format!("E_{}_G", pollutant.to_uppercase())
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

// ============================================================================
// Tables
// ============================================================================

const EMISSION_COLUMNS: [&str; 20] = [
    "STRUCTURE_ID",
    "INCIDENT",
    "INCIDENT_NUMBER",
    "YEAR",
    "MONTH",
    "COUNTY",
    "AIR_BASIN",
    "AIR_DISTRICT",
    "AIR_DISTRICT_ID",
    "COABDIS",
    "AOI_INDEX",
    "DAMAGE",
    "CATEGORY",
    "FLOOR_AREA_FT2",
    "X",
    "Y",
    "CONSUMPTION_FRACTION",
    "FRAME_FACTOR",
    "CONTENTS_FACTOR",
    "CONSUMED_FUEL_KG",
];

fn emission_fields(row: &EmissionRow) -> Vec<String> {
    let mut fields = vec![
        row.structure_id.clone(),
        row.incident_name.clone(),
        row.incident_number.clone(),
        opt(row.year),
        opt(row.month),
        row.county.clone(),
        row.air_basin.clone(),
        row.air_district.clone(),
        row.district_id.clone(),
        row.coabdis.clone(),
        opt(row.aoi_index),
        row.damage.label().to_string(),
        row.category.clone().unwrap_or_default(),
        opt(row.floor_area),
        opt(row.location.map(|l| l.x)),
        opt(row.location.map(|l| l.y)),
        row.consumption_fraction.to_string(),
        row.frame_factor.to_string(),
        row.contents_factor.to_string(),
        row.consumed_fuel_kg.to_string(),
    ];
    fields.extend(row.emissions_g.iter().map(f64::to_string));
    fields
}

/// Detailed per-structure emissions.
pub fn emissions_csv(table: &EmissionTable) -> String {
    let mut out = String::new();
    let header = EMISSION_COLUMNS
        .iter()
        .map(|c| (*c).to_string())
        .chain(table.pollutants.iter().map(|p| pollutant_column(p)));
    push_line(&mut out, &csv_join(header));
    for row in &table.rows {
        push_line(&mut out, &csv_join(emission_fields(row)));
    }
    out
}

/// Grouped totals. `count_column` / `damaged_column` name the two counters,
/// which differ between structure and vehicle summaries.
pub fn aggregate_csv(table: &AggregateTable, count_column: &str, damaged_column: &str) -> String {
    let mut out = String::new();
    let header = table
        .keys
        .iter()
        .map(|k| k.column().to_string())
        .chain([count_column.to_string(), damaged_column.to_string()])
        .chain(table.pollutants.iter().map(|p| pollutant_column(p)));
    push_line(&mut out, &csv_join(header));
    for row in &table.rows {
        let fields = row
            .keys
            .iter()
            .map(ToString::to_string)
            .chain([row.count.to_string(), row.damaged.to_string()])
            .chain(row.totals_g.iter().map(f64::to_string));
        push_line(&mut out, &csv_join(fields));
    }
    out
}

pub fn exclusions_csv(report: &ExclusionReport) -> String {
    let mut out = String::from("RECORD_ID,REASON\n");
    for e in &report.excluded {
        push_line(&mut out, &csv_join([e.record_id.as_str(), e.reason.as_str()]));
    }
    out
}

/// Point features for every emission row that has a location.
pub fn emissions_geojson(table: &EmissionTable) -> Result<String, ReportError> {
    let features: Vec<Value> = table
        .rows
        .iter()
        .filter_map(|row| {
            let loc = row.location?;
            let mut props = Map::new();
            for (column, value) in EMISSION_COLUMNS.iter().zip(emission_fields(row)) {
                if matches!(*column, "X" | "Y") {
                    continue;
                }
                props.insert((*column).to_string(), Value::String(value));
            }
            for (p, g) in table.pollutants.iter().zip(&row.emissions_g) {
                props.insert(pollutant_column(p), json!(g));
            }
            Some(json!({
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [loc.x, loc.y]},
                "properties": props,
            }))
        })
        .collect();

    let doc = json!({
        "type": "FeatureCollection",
        "features": features,
    });
    Ok(serde_json::to_string_pretty(&doc)?)
}

// ============================================================================
// Run Directory
// ============================================================================

/// Paths written by [`write_reports`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub dir: PathBuf,
    pub files: Vec<PathBuf>,
}

fn write_file(path: &Path, contents: &str) -> Result<(), ReportError> {
    std::fs::write(path, contents).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write all report files for a run into `<out_dir>/SWEEP_<suffix>/`.
pub fn write_reports(
    output: &RunOutput,
    out_dir: &Path,
    suffix: &str,
    spatial: bool,
) -> Result<ReportPaths, ReportError> {
    let dir = out_dir.join(format!("SWEEP_{suffix}"));
    std::fs::create_dir_all(&dir).map_err(|source| ReportError::Io {
        path: dir.clone(),
        source,
    })?;

    let mut files = vec![
        (EMISSIONS_REPORT, emissions_csv(&output.emissions)),
        (
            AGGREGATED_REPORT,
            aggregate_csv(&output.aggregate, "STRUCTURES", "DAMAGED_STRUCTURES"),
        ),
        (
            VEHICLE_REPORT,
            aggregate_csv(&output.vehicle_summary, "VEHICLES", "DESTROYED_STRUCTURES"),
        ),
        (EXCLUSIONS_REPORT, exclusions_csv(&output.exclusions)),
    ];
    if spatial {
        files.push((SPATIAL_REPORT, emissions_geojson(&output.emissions)?));
    }

    let mut written = Vec::with_capacity(files.len());
    for (name, contents) in files {
        let path = dir.join(name);
        write_file(&path, &contents)?;
        written.push(path);
    }

    info!(dir = %dir.display(), files = written.len(), "Reports written");
    Ok(ReportPaths { dir, files: written })
}

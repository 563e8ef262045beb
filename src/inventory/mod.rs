//! Structure inventory loading
//!
//! Reads a burned-structures inventory from local files into
//! `StructureRecord`s. Two layouts are understood:
//!
//! - GeoJSON `FeatureCollection` of point features with BSDB property names
//! - CSV with the same column names plus `x` / `y` coordinates
//!
//! Property and column names are matched case-insensitively. Values the
//! engine needs but cannot parse are left empty here; the calculator reports
//! them per record rather than the loader rejecting the whole file.

mod csv;
pub mod geojson;

pub use self::csv::parse_inventory_csv;
pub use self::geojson::{parse_inventory_geojson, Polygon};

use crate::types::StructureRecord;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

// ============================================================================
// Field Names
// ============================================================================

/// BSDB attribute names, lower-case.
pub mod fields {
    pub const ID: &str = "globalid";
    pub const INCIDENT_NAME: &str = "incidentname";
    pub const INCIDENT_NUMBER: &str = "incidentnum";
    pub const DATE: &str = "clean_date";
    pub const DAMAGE: &str = "damage";
    pub const COUNTY: &str = "county";
    pub const AIR_BASIN: &str = "basin_name";
    pub const AIR_DISTRICT: &str = "dis_name";
    pub const DISTRICT_ID: &str = "disa_id";
    pub const COABDIS: &str = "coabdis";
    pub const FLOOR_AREA: &str = "sqft";
    pub const CATEGORY: &str = "cat";
    pub const STRUCTURE_TYPE: &str = "structuretype";
    pub const X: &str = "x";
    pub const Y: &str = "y";
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path}: {message}")]
    Format { path: PathBuf, message: String },

    #[error("{path} is missing required column {column}")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("{path}: unsupported inventory format (expected .geojson, .json or .csv)")]
    UnsupportedFormat { path: PathBuf },
}

// ============================================================================
// Loading
// ============================================================================

/// Load an inventory file, choosing the parser by extension.
pub fn load_inventory(path: &Path) -> Result<Vec<StructureRecord>, InventoryError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let contents = std::fs::read_to_string(path).map_err(|source| InventoryError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let records = match ext.as_str() {
        "geojson" | "json" => parse_inventory_geojson(&contents, path)?,
        "csv" => parse_inventory_csv(&contents, path)?,
        _ => {
            return Err(InventoryError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    };

    info!(
        path = %path.display(),
        records = records.len(),
        "Loaded structure inventory"
    );
    Ok(records)
}

/// Parse an inventory date cell.
///
/// Accepts ISO dates, ISO date-times (with or without offset) and ESRI
/// epoch milliseconds.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let s = value.trim().trim_matches('"');
    if s.is_empty() || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("null") {
        return None;
    }

    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%m/%d/%Y %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%m/%d/%Y") {
        return Some(d);
    }
    // ESRI services emit dates as epoch milliseconds, sometimes as floats
    match s.parse::<f64>() {
        Ok(ms) if ms.is_finite() => {
            DateTime::from_timestamp_millis(ms as i64).map(|dt| dt.date_naive())
        }
        _ => None,
    }
}

/// Parse a numeric cell; blank, `nan` and unparseable values give `None`.
pub(crate) fn parse_number(value: &str) -> Option<f64> {
    let s = value.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("null") {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Builds a record from a field lookup shared by the CSV and GeoJSON readers.
pub(crate) fn record_from_fields<'a>(
    get: impl Fn(&str) -> Option<&'a str>,
    fallback_id: impl FnOnce() -> String,
) -> StructureRecord {
    let text = |name: &str| get(name).map(str::trim).unwrap_or_default().to_string();
    StructureRecord {
        id: non_empty(get(fields::ID)).unwrap_or_else(fallback_id),
        incident_name: text(fields::INCIDENT_NAME),
        incident_number: text(fields::INCIDENT_NUMBER),
        incident_date: get(fields::DATE).and_then(parse_date),
        damage: non_empty(get(fields::DAMAGE)),
        county: text(fields::COUNTY),
        air_basin: text(fields::AIR_BASIN),
        air_district: text(fields::AIR_DISTRICT),
        district_id: text(fields::DISTRICT_ID),
        coabdis: text(fields::COABDIS),
        location: None,
        floor_area: get(fields::FLOOR_AREA).and_then(parse_number),
        category: non_empty(get(fields::CATEGORY)),
        structure_type: non_empty(get(fields::STRUCTURE_TYPE)),
        aoi_index: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2020, 9, 27);
        assert_eq!(parse_date("2020-09-27"), expected);
        assert_eq!(parse_date("2020-09-27T14:05:00"), expected);
        assert_eq!(parse_date("2020-09-27 14:05:00"), expected);
        assert_eq!(parse_date("2020-09-27T14:05:00-07:00"), expected);
        assert_eq!(parse_date("09/27/2020"), expected);
        assert_eq!(parse_date("1601164800000"), expected);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("soon"), None);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(" 1850 "), Some(1850.0));
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("n/a"), None);
    }

    #[test]
    fn test_load_dispatches_on_extension() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "globalid,incidentname,clean_date,damage,x,y").unwrap();
        writeln!(file, "G1,ZOGG,2020-09-27,Destroyed (>50%),-122.5,40.5").unwrap();
        let records = load_inventory(file.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].incident_name, "ZOGG");

        let other = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        assert!(matches!(
            load_inventory(other.path()),
            Err(InventoryError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_inventory(Path::new("/nonexistent/bsdb.geojson")).unwrap_err();
        assert!(matches!(err, InventoryError::Io { .. }));
    }
}

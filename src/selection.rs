//! Automated record selection
//!
//! Narrows an inventory to the records a run covers. Three independent
//! predicates, all optional, combined with AND:
//!
//! - attribute filter: one field matched case-insensitively against a list
//! - date window: inclusive start / end on the incident date
//! - AOI: point-in-polygon against a polygon set; a record in polygon `i`
//!   gets `aoi_index = i`

use crate::error::ConfigurationError;
use crate::inventory::geojson::parse_aoi_geojson;
use crate::inventory::{InventoryError, Polygon};
use crate::types::{Location, StructureRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

// ============================================================================
// Attribute Filter
// ============================================================================

/// Inventory attributes a selection can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    WildfireName,
    IncidentNumber,
    County,
    AirBasin,
    AirDistrict,
    Coabdis,
}

impl FilterField {
    pub fn parse(name: &str) -> Result<Self, ConfigurationError> {
        let normalized = name.trim().to_lowercase().replace(['_', '-'], " ");
        match normalized.split_whitespace().collect::<Vec<_>>().join(" ").as_str() {
            "wildfire name" | "incident" | "incident name" => Ok(FilterField::WildfireName),
            "incident number" => Ok(FilterField::IncidentNumber),
            "county" => Ok(FilterField::County),
            "air basin" => Ok(FilterField::AirBasin),
            "air district" => Ok(FilterField::AirDistrict),
            "coabdis" | "coabdis code" => Ok(FilterField::Coabdis),
            _ => Err(ConfigurationError::UnknownChoice {
                field: "selection.field",
                value: name.to_string(),
                expected: "Wildfire Name, Incident Number, County, Air Basin, Air District, CoAbDis Code"
                    .to_string(),
            }),
        }
    }

    fn value_of(self, record: &StructureRecord) -> &str {
        match self {
            FilterField::WildfireName => &record.incident_name,
            FilterField::IncidentNumber => &record.incident_number,
            FilterField::County => &record.county,
            FilterField::AirBasin => &record.air_basin,
            FilterField::AirDistrict => &record.air_district,
            FilterField::Coabdis => &record.coabdis,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeFilter {
    pub field: FilterField,
    values: Vec<String>,
}

impl AttributeFilter {
    pub fn new(field: FilterField, values: &[String]) -> Self {
        Self {
            field,
            values: values.iter().map(|v| v.trim().to_uppercase()).collect(),
        }
    }

    pub fn matches(&self, record: &StructureRecord) -> bool {
        let value = self.field.value_of(record).trim().to_uppercase();
        self.values.iter().any(|v| *v == value)
    }
}

// ============================================================================
// Date Window
// ============================================================================

/// Inclusive incident-date bounds. Either end may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateWindow {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl DateWindow {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self, ConfigurationError> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(ConfigurationError::InvalidDateWindow {
                    start: s.to_string(),
                    end: e.to_string(),
                });
            }
        }
        Ok(Self { start, end })
    }

    pub fn is_open(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Undated records fall outside any bounded window.
    pub fn contains(&self, date: Option<NaiveDate>) -> bool {
        if self.is_open() {
            return true;
        }
        date.is_some_and(|d| self.start.map_or(true, |s| d >= s) && self.end.map_or(true, |e| d <= e))
    }
}

// ============================================================================
// Area of Interest
// ============================================================================

/// Ordered AOI polygon set. Index `i` covers the polygons of source feature `i`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Aoi {
    areas: Vec<Vec<Polygon>>,
}

impl Aoi {
    pub fn new(areas: Vec<Vec<Polygon>>) -> Self {
        Self { areas }
    }

    pub fn load(path: &Path) -> Result<Self, InventoryError> {
        let contents = std::fs::read_to_string(path).map_err(|source| InventoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let areas = parse_aoi_geojson(&contents, path)?;
        info!(path = %path.display(), areas = areas.len(), "Loaded AOI polygons");
        Ok(Self { areas })
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// Index of the first area containing `point`.
    pub fn locate(&self, point: Location) -> Option<u32> {
        self.areas
            .iter()
            .position(|polys| polys.iter().any(|p| p.contains(point)))
            .and_then(|i| u32::try_from(i).ok())
    }
}

// ============================================================================
// Selection
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectionCriteria {
    pub attribute: Option<AttributeFilter>,
    pub window: DateWindow,
    pub aoi: Option<Aoi>,
}

impl SelectionCriteria {
    pub fn is_empty(&self) -> bool {
        self.attribute.is_none() && self.window.is_open() && self.aoi.is_none()
    }
}

/// Apply `criteria` to an inventory, tagging AOI indices on the way.
///
/// Records without a location never fall inside an AOI.
pub fn select(records: Vec<StructureRecord>, criteria: &SelectionCriteria) -> Vec<StructureRecord> {
    let total = records.len();
    let selected: Vec<StructureRecord> = records
        .into_iter()
        .filter(|r| criteria.attribute.as_ref().map_or(true, |f| f.matches(r)))
        .filter(|r| criteria.window.contains(r.incident_date))
        .filter_map(|mut r| match &criteria.aoi {
            None => Some(r),
            Some(aoi) => {
                let index = r.location.and_then(|loc| aoi.locate(loc))?;
                r.aoi_index = Some(index);
                Some(r)
            }
        })
        .collect();

    info!(
        total,
        selected = selected.len(),
        attribute = ?criteria.attribute.as_ref().map(|f| f.field),
        aoi_areas = criteria.aoi.as_ref().map_or(0, Aoi::len),
        "Selected inventory records"
    );
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, county: &str, date: (i32, u32, u32), at: (f64, f64)) -> StructureRecord {
        StructureRecord {
            id: id.to_string(),
            incident_name: "NORTH COMPLEX".to_string(),
            incident_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2),
            damage: Some("Destroyed".to_string()),
            county: county.to_string(),
            location: Some(Location::new(at.0, at.1)),
            ..Default::default()
        }
    }

    fn square(x0: f64, y0: f64) -> Vec<Polygon> {
        vec![Polygon::new(vec![(x0, y0), (x0 + 1.0, y0), (x0 + 1.0, y0 + 1.0), (x0, y0 + 1.0)])]
    }

    fn sample() -> Vec<StructureRecord> {
        vec![
            record("1", "Butte", (2020, 9, 8), (0.5, 0.5)),
            record("2", "Plumas", (2020, 9, 9), (5.5, 5.5)),
            record("3", "BUTTE", (2021, 7, 1), (9.0, 9.0)),
        ]
    }

    #[test]
    fn test_attribute_filter_case_insensitive() {
        let criteria = SelectionCriteria {
            attribute: Some(AttributeFilter::new(FilterField::County, &["butte".to_string()])),
            ..Default::default()
        };
        let ids: Vec<_> = select(sample(), &criteria).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["1", "3"]);
    }

    #[test]
    fn test_date_window_inclusive() {
        let criteria = SelectionCriteria {
            window: DateWindow::new(NaiveDate::from_ymd_opt(2020, 9, 9), NaiveDate::from_ymd_opt(2021, 7, 1))
                .unwrap(),
            ..Default::default()
        };
        let ids: Vec<_> = select(sample(), &criteria).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["2", "3"]);
    }

    #[test]
    fn test_inverted_window_rejected() {
        let err = DateWindow::new(NaiveDate::from_ymd_opt(2021, 1, 1), NaiveDate::from_ymd_opt(2020, 1, 1))
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidDateWindow { .. }));
    }

    #[test]
    fn test_undated_outside_bounded_window() {
        let window = DateWindow::new(NaiveDate::from_ymd_opt(2020, 1, 1), None).unwrap();
        assert!(!window.contains(None));
        assert!(DateWindow::default().contains(None));
    }

    #[test]
    fn test_aoi_tags_index() {
        let criteria = SelectionCriteria {
            aoi: Some(Aoi::new(vec![square(5.0, 5.0), square(0.0, 0.0)])),
            ..Default::default()
        };
        let selected = select(sample(), &criteria);
        let tagged: Vec<_> = selected.iter().map(|r| (r.id.as_str(), r.aoi_index)).collect();
        assert_eq!(tagged, [("1", Some(1)), ("2", Some(0))]);
    }

    #[test]
    fn test_empty_criteria_keeps_all() {
        let criteria = SelectionCriteria::default();
        assert!(criteria.is_empty());
        assert_eq!(select(sample(), &criteria).len(), 3);
    }

    #[test]
    fn test_filter_field_spellings() {
        assert_eq!(FilterField::parse("Wildfire Name").unwrap(), FilterField::WildfireName);
        assert_eq!(FilterField::parse("air_district").unwrap(), FilterField::AirDistrict);
        assert_eq!(FilterField::parse("CoAbDis Code").unwrap(), FilterField::Coabdis);
        assert!(FilterField::parse("zip").is_err());
    }
}

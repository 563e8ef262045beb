//! GeoJSON reading: inventory point features and AOI polygons
//!
//! Geometry is handled as raw `serde_json::Value` so unknown geometry types
//! and extra members never fail a whole file.

use super::{record_from_fields, InventoryError};
use crate::types::{Location, StructureRecord};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Polygon with an exterior ring and optional holes. Coordinates are in the
/// inventory's CRS; no reprojection is done.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub exterior: Vec<(f64, f64)>,
    pub holes: Vec<Vec<(f64, f64)>>,
}

impl Polygon {
    pub fn new(exterior: Vec<(f64, f64)>) -> Self {
        Self {
            exterior,
            holes: Vec::new(),
        }
    }

    /// Point-in-polygon by ray casting. Points inside a hole are outside.
    pub fn contains(&self, point: Location) -> bool {
        ring_contains(&self.exterior, point) && !self.holes.iter().any(|h| ring_contains(h, point))
    }
}

/// Even-odd ray casting against one ring.
fn ring_contains(ring: &[(f64, f64)], p: Location) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if (yi > p.y) != (yj > p.y) && p.x < (xj - xi) * (p.y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

// ============================================================================
// Document Parsing
// ============================================================================

fn format_error(path: &Path, message: impl Into<String>) -> InventoryError {
    InventoryError::Format {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

/// Parse text and return the `features` array of a FeatureCollection, or a
/// lone Feature as a one-element list.
fn features(contents: &str, path: &Path) -> Result<Vec<Value>, InventoryError> {
    let doc: Value = serde_json::from_str(contents).map_err(|source| InventoryError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    match doc.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => match doc.get("features") {
            Some(Value::Array(features)) => Ok(features.clone()),
            _ => Err(format_error(path, "FeatureCollection has no features array")),
        },
        Some("Feature") => Ok(vec![doc]),
        Some(other) => Err(format_error(path, format!("expected a FeatureCollection, found {other}"))),
        None => Err(format_error(path, "not a GeoJSON object (missing \"type\")")),
    }
}

/// Property values as text, keyed by lower-cased property name.
fn property_text(properties: Option<&Map<String, Value>>) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for (key, value) in properties.into_iter().flatten() {
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s.clone(),
            Value::Number(n) => n
                .as_i64()
                .map_or_else(|| n.to_string(), |i| i.to_string()),
            Value::Bool(b) => b.to_string(),
            other => other.to_string(),
        };
        out.insert(key.to_lowercase(), text);
    }
    out
}

fn coord(value: &Value) -> Option<(f64, f64)> {
    let arr = value.as_array()?;
    Some((arr.first()?.as_f64()?, arr.get(1)?.as_f64()?))
}

fn ring(value: &Value) -> Option<Vec<(f64, f64)>> {
    value.as_array()?.iter().map(coord).collect()
}

fn polygon(value: &Value) -> Option<Polygon> {
    let mut rings = value.as_array()?.iter().map(ring);
    let exterior = rings.next()??;
    let holes = rings.collect::<Option<Vec<_>>>()?;
    Some(Polygon { exterior, holes })
}

/// Point location of a geometry. Multi-points use their first member.
fn point_of(geometry: &Value) -> Option<Location> {
    let coords = geometry.get("coordinates")?;
    let (x, y) = match geometry.get("type")?.as_str()? {
        "Point" => coord(coords)?,
        "MultiPoint" => coord(coords.as_array()?.first()?)?,
        _ => return None,
    };
    Some(Location::new(x, y))
}

/// Polygons of a Polygon or MultiPolygon geometry.
fn polygons_of(geometry: &Value) -> Option<Vec<Polygon>> {
    let coords = geometry.get("coordinates")?;
    match geometry.get("type")?.as_str()? {
        "Polygon" => Some(vec![polygon(coords)?]),
        "MultiPolygon" => coords.as_array()?.iter().map(polygon).collect(),
        _ => None,
    }
}

// ============================================================================
// Public Readers
// ============================================================================

/// Parse a BSDB GeoJSON FeatureCollection into structure records.
///
/// Features without a point geometry keep `location = None`.
pub fn parse_inventory_geojson(
    contents: &str,
    path: &Path,
) -> Result<Vec<StructureRecord>, InventoryError> {
    let features = features(contents, path)?;
    let records: Vec<StructureRecord> = features
        .iter()
        .enumerate()
        .map(|(idx, feature)| {
            let props = property_text(feature.get("properties").and_then(Value::as_object));
            let feature_id = feature.get("id").map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
            let mut record = record_from_fields(
                |name| props.get(name).map(String::as_str),
                || feature_id.unwrap_or_else(|| format!("feature-{idx}")),
            );
            record.location = feature.get("geometry").and_then(point_of);
            record
        })
        .collect();
    debug!(path = %path.display(), records = records.len(), "Parsed GeoJSON inventory");
    Ok(records)
}

/// Parse an AOI FeatureCollection. Entry `i` holds the polygons of feature
/// `i`; features without polygon geometry are rejected so AOI indices stay
/// aligned with the source file.
pub fn parse_aoi_geojson(contents: &str, path: &Path) -> Result<Vec<Vec<Polygon>>, InventoryError> {
    features(contents, path)?
        .iter()
        .enumerate()
        .map(|(idx, feature)| {
            feature
                .get("geometry")
                .and_then(polygons_of)
                .ok_or_else(|| format_error(path, format!("feature {idx} is not a Polygon or MultiPolygon")))
        })
        .collect()
}

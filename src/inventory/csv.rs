//! CSV inventory reader (BSDB column names plus `x` / `y`)

use super::{fields, parse_number, record_from_fields, InventoryError};
use crate::tabular::{cell, csv_split, HeaderIndex};
use crate::types::{Location, StructureRecord};
use std::path::Path;
use tracing::{debug, warn};

/// Parse CSV inventory text. `path` is used for error context only.
///
/// A header with no `damage` column is rejected outright; every other column
/// is optional. Rows whose field count does not match the header are skipped
/// with a warning.
pub fn parse_inventory_csv(contents: &str, path: &Path) -> Result<Vec<StructureRecord>, InventoryError> {
    let mut lines = contents.lines().enumerate();
    let header = lines
        .by_ref()
        .find(|(_, l)| !l.trim().is_empty())
        .map(|(_, l)| HeaderIndex::from_header(l))
        .ok_or_else(|| InventoryError::Format {
            path: path.to_path_buf(),
            message: "empty file".to_string(),
        })?;

    if header.get(fields::DAMAGE).is_none() {
        return Err(InventoryError::MissingColumn {
            path: path.to_path_buf(),
            column: fields::DAMAGE,
        });
    }

    let x_idx = header.get(fields::X);
    let y_idx = header.get(fields::Y);
    let width = header.len();

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for (idx, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let line_num = idx + 1;
        let row = csv_split(line);
        if row.len() != width {
            if skipped < 10 {
                warn!(line = line_num, expected = width, found = row.len(), "Skipping malformed inventory row");
            }
            skipped += 1;
            continue;
        }

        let mut record = record_from_fields(
            |name| cell(&row, header.get(name)),
            || format!("row-{line_num}"),
        );
        let x = cell(&row, x_idx).and_then(parse_number);
        let y = cell(&row, y_idx).and_then(parse_number);
        if let (Some(x), Some(y)) = (x, y) {
            record.location = Some(Location::new(x, y));
        }
        records.push(record);
    }

    debug!(path = %path.display(), records = records.len(), skipped, "Parsed CSV inventory");
    Ok(records)
}

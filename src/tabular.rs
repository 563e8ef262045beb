//! Minimal CSV handling shared by the inventory loader, the custom factor
//! table reader and the report writer.

use std::collections::HashMap;

/// Split a CSV line respecting quoted fields (handles commas inside quotes).
/// Returns owned strings because quoted fields need unquoting.
pub fn csv_split(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    // Escaped quote ("")
                    if chars.peek() == Some(&'"') {
                        current.push('"');
                        chars.next();
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}

/// Quote a field for CSV output when it contains a delimiter, quote or newline.
pub fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Join fields into one CSV line (no trailing newline).
pub fn csv_join<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fields
        .into_iter()
        .map(|f| csv_escape(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Header lookup: upper-cased, trimmed column name -> index.
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
    columns: HashMap<String, usize>,
    width: usize,
}

impl HeaderIndex {
    pub fn from_header(line: &str) -> Self {
        // Spreadsheet exports often start with a UTF-8 BOM
        let line = line.trim_start_matches('\u{feff}');
        let names = csv_split(line);
        let width = names.len();
        let columns = names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| (name.trim().to_uppercase(), idx))
            .collect();
        Self { columns, width }
    }

    /// Number of fields in the header row.
    pub fn len(&self) -> usize {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0
    }

    /// Index of a column, case-insensitive.
    pub fn get(&self, name: &str) -> Option<usize> {
        self.columns.get(&name.to_uppercase()).copied()
    }

    /// First of several alternative column names present in the header.
    pub fn first_of(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|n| self.get(n))
    }
}

/// Trimmed cell at `idx`, `None` when the column is absent or the cell blank.
pub fn cell(fields: &[String], idx: Option<usize>) -> Option<&str> {
    let value = fields.get(idx?)?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

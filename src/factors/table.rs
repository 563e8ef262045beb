//! Emission-factor tables: built-in or read from a user CSV, plus the
//! pollutant-selection step that narrows a table to the run's columns.

use super::builtin::VEHICLE_FUEL_MASS_KG;
use crate::error::ConfigurationError;
use crate::tabular::{cell, csv_split, HeaderIndex};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Which pollutants a run estimates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PollutantSelection {
    /// Every pollutant in the chosen table
    All,
    /// The fixed criteria-pollutant subset for the table kind
    #[default]
    Default,
    /// Exactly these pollutants, matched case-insensitively
    List(Vec<String>),
}

/// Column layout a custom factor file must follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// `POLLUTANT`, `STRUCTURE_GKG`
    Structure,
    /// `POLLUTANT` and `VEHICLE_GFIRE` or `VEHICLE_GKG`
    Vehicle,
}

/// Ordered pollutant -> rate table.
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionFactorTable {
    /// Table name used in logs and error messages
    pub name: String,
    entries: Vec<(String, f64)>,
}

impl EmissionFactorTable {
    pub fn new(name: impl Into<String>, entries: Vec<(String, f64)>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }

    pub fn from_static(name: &str, entries: &[(&str, f64)]) -> Self {
        Self::new(
            name,
            entries.iter().map(|(p, v)| ((*p).to_string(), *v)).collect(),
        )
    }

    /// Same table with every rate multiplied by `factor`.
    pub fn scaled(mut self, factor: f64) -> Self {
        for (_, v) in &mut self.entries {
            *v *= factor;
        }
        self
    }

    pub fn pollutants(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(p, _)| p.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Case-insensitive lookup returning the table's own spelling.
    pub fn lookup(&self, pollutant: &str) -> Option<(&str, f64)> {
        let wanted = pollutant.trim();
        self.entries
            .iter()
            .find(|(p, _)| p.eq_ignore_ascii_case(wanted))
            .map(|(p, v)| (p.as_str(), *v))
    }

    /// Narrow the table to a selection, returning parallel name/rate vectors.
    ///
    /// `defaults` is the subset used for `PollutantSelection::Default`.
    /// Explicit names keep request order; duplicates collapse to their first
    /// occurrence. A requested pollutant absent from the table fails.
    pub fn select(
        &self,
        selection: &PollutantSelection,
        defaults: &[&str],
    ) -> Result<(Vec<String>, Vec<f64>), ConfigurationError> {
        let requested: Vec<String> = match selection {
            PollutantSelection::All => {
                return self.non_empty(
                    self.entries.iter().map(|(p, _)| p.clone()).collect(),
                    self.entries.iter().map(|(_, v)| *v).collect(),
                )
            }
            PollutantSelection::Default => defaults.iter().map(|s| (*s).to_string()).collect(),
            PollutantSelection::List(list) => list.clone(),
        };

        let mut names: Vec<String> = Vec::with_capacity(requested.len());
        let mut rates = Vec::with_capacity(requested.len());
        for want in &requested {
            let (name, rate) =
                self.lookup(want)
                    .ok_or_else(|| ConfigurationError::UnknownPollutant {
                        pollutant: want.clone(),
                        table: self.name.clone(),
                        available: self.pollutants().collect::<Vec<_>>().join(", "),
                    })?;
            if names.iter().any(|n| n == name) {
                continue;
            }
            names.push(name.to_string());
            rates.push(rate);
        }
        self.non_empty(names, rates)
    }

    fn non_empty(
        &self,
        names: Vec<String>,
        rates: Vec<f64>,
    ) -> Result<(Vec<String>, Vec<f64>), ConfigurationError> {
        if names.is_empty() {
            return Err(ConfigurationError::EmptyPollutantSelection {
                table: self.name.clone(),
            });
        }
        Ok((names, rates))
    }

    // ------------------------------------------------------------------------
    // Custom CSV tables
    // ------------------------------------------------------------------------

    /// Load a user-supplied factor table.
    ///
    /// Rows with a blank rate are skipped (pollutant not available in this
    /// table). Non-numeric, negative or non-finite rates fail with the file,
    /// line and pollutant that carried them.
    pub fn load_csv(path: &Path, kind: TableKind) -> Result<Self, ConfigurationError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigurationError::CustomTableIo {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::parse_csv(&contents, path, kind)?;
        info!(
            path = %path.display(),
            pollutants = table.len(),
            "Loaded custom emission factor table"
        );
        Ok(table)
    }

    /// Parse table contents; `path` is only used for error context.
    pub fn parse_csv(contents: &str, path: &Path, kind: TableKind) -> Result<Self, ConfigurationError> {
        let missing = |column: &str| ConfigurationError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
        };

        let mut lines = contents.lines().enumerate();
        let header = lines
            .by_ref()
            .find(|(_, l)| !l.trim().is_empty())
            .map(|(_, l)| HeaderIndex::from_header(l))
            .ok_or_else(|| missing("POLLUTANT"))?;

        let pollutant_col = header.get("POLLUTANT").ok_or_else(|| missing("POLLUTANT"))?;

        // (column index, multiplier to grams per unit)
        let rate_cols: Vec<(usize, f64)> = match kind {
            TableKind::Structure => {
                vec![(header.get("STRUCTURE_GKG").ok_or_else(|| missing("STRUCTURE_GKG"))?, 1.0)]
            }
            TableKind::Vehicle => {
                let cols: Vec<(usize, f64)> = [
                    header.get("VEHICLE_GFIRE").map(|i| (i, 1.0)),
                    header.get("VEHICLE_GKG").map(|i| (i, VEHICLE_FUEL_MASS_KG)),
                ]
                .into_iter()
                .flatten()
                .collect();
                if cols.is_empty() {
                    return Err(missing("VEHICLE_GFIRE or VEHICLE_GKG"));
                }
                cols
            }
        };

        let mut entries: Vec<(String, f64)> = Vec::new();
        for (line_idx, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            let fields = csv_split(line);
            let Some(pollutant) = cell(&fields, Some(pollutant_col)) else {
                continue;
            };

            // First non-blank rate column wins
            let Some((raw, multiplier)) = rate_cols
                .iter()
                .find_map(|(idx, m)| cell(&fields, Some(*idx)).map(|v| (v, *m)))
            else {
                debug!(pollutant, line = line_idx + 1, "Blank rate, pollutant skipped");
                continue;
            };

            let rate: f64 = raw
                .parse()
                .ok()
                .filter(|v: &f64| v.is_finite() && *v >= 0.0)
                .ok_or_else(|| ConfigurationError::InvalidRate {
                    path: path.to_path_buf(),
                    line: line_idx + 1,
                    pollutant: pollutant.to_string(),
                    value: raw.to_string(),
                })?;

            if entries.iter().any(|(p, _)| p.eq_ignore_ascii_case(pollutant)) {
                continue;
            }
            entries.push((pollutant.to_string(), rate * multiplier));
        }

        Ok(Self::new(custom_name(path), entries))
    }
}

fn custom_name(path: &Path) -> String {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("unnamed");
    format!("CUSTOM ({stem})")
}

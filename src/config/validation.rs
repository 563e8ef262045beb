//! Config validation: unknown-key detection with Levenshtein suggestions
//! and range checks.
//!
//! Two-pass parse: first deserialize raw TOML into `toml::Value`, walk the
//! key tree, compare against known field names, and emit warnings with
//! "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Unknown keys never fail a load.

use super::defaults::{SUSPICIOUS_FLOOR_AREA_FT2, SUSPICIOUS_VEHICLE_RATIO};
use super::{RunConfig, ScalarSetting};
use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Every valid dotted key path of `RunConfig`.
///
/// Kept by hand in step with run_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [structures]
        "structures",
        "structures.emission_factors",
        "structures.custom_table",
        "structures.frame_factor",
        "structures.contents_factor",
        "structures.consumption",
        "structures.fuel_load_basis",
        "structures.default_floor_area",
        "structures.pollutants",
        // [vehicles]
        "vehicles",
        "vehicles.emission_factors",
        "vehicles.custom_table",
        "vehicles.pollutants",
        "vehicles.mode",
        "vehicles.value",
        "vehicles.group_by",
        // [report]
        "report",
        "report.aggregate_keys",
        "report.output_dir",
        "report.suffix",
        "report.write_spatial",
        // [selection]
        "selection",
        "selection.field",
        "selection.values",
        "selection.start_date",
        "selection.end_date",
        "selection.aoi",
        // [predictor]
        "predictor",
        "predictor.ratio_destroyed",
        "predictor.seed",
        "predictor.incident_name",
        "predictor.incident_date",
        "predictor.aggregate_keys",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// A table `{ a = { b = 1, c = 2 } }` yields `["a", "a.b", "a.c"]`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let b_len = b.chars().count();
    if a.is_empty() {
        return b_len;
    }
    if b.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Closest known key within edit distance 3. Ties go to the
/// lexicographically smaller key so suggestions are stable.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|k| (levenshtein(unknown, k), *k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Warnings for every unknown key in a raw TOML string.
///
/// Unparseable TOML yields no warnings; serde reports it on the second pass.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };

    let known = known_config_keys();
    let mut found = walk_toml_keys(&value, "");
    found.sort();

    found
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Range Validation
// ============================================================================

fn check_scalar(setting: &ScalarSetting, field: &str, errors: &mut Vec<String>) {
    if let ScalarSetting::Value(v) = setting {
        if !v.is_finite() || *v <= 0.0 {
            errors.push(format!("{field} = {v} must be a positive finite number"));
        }
    }
}

/// Numeric range checks on a parsed config.
///
/// Returns (errors, warnings): errors are impossible values that must stop
/// the run; warnings are legal but suspicious.
pub fn validate_ranges(config: &RunConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let s = &config.structures;
    check_scalar(&s.frame_factor, "structures.frame_factor", &mut errors);
    check_scalar(&s.contents_factor, "structures.contents_factor", &mut errors);
    if let Some(area) = s.default_floor_area {
        if !area.is_finite() || area <= 0.0 {
            errors.push(format!(
                "structures.default_floor_area = {area} must be a positive finite number"
            ));
        } else if area > SUSPICIOUS_FLOOR_AREA_FT2 {
            warnings.push(ValidationWarning {
                field: "structures.default_floor_area".to_string(),
                message: format!(
                    "structures.default_floor_area = {area} ft² is unusually large (> {SUSPICIOUS_FLOOR_AREA_FT2})"
                ),
                suggestion: None,
            });
        }
    }

    let v = &config.vehicles;
    if !v.value.is_finite() || v.value < 0.0 {
        errors.push(format!(
            "vehicles.value = {} must be a non-negative finite number",
            v.value
        ));
    } else if v.mode.trim().eq_ignore_ascii_case("RATIO") && v.value > SUSPICIOUS_VEHICLE_RATIO {
        warnings.push(ValidationWarning {
            field: "vehicles.value".to_string(),
            message: format!(
                "vehicles.value = {} vehicles per destroyed structure is unusually high",
                v.value
            ),
            suggestion: None,
        });
    }

    let sel = &config.selection;
    if let (Some(start), Some(end)) = (sel.start_date, sel.end_date) {
        if start > end {
            errors.push(format!(
                "selection.start_date ({start}) must not be after selection.end_date ({end})"
            ));
        }
    }
    if sel.field.is_some() && sel.values.is_empty() {
        errors.push("selection.values must list at least one value when selection.field is set".to_string());
    }

    let r = config.predictor.ratio_destroyed;
    if !r.is_finite() || !(0.0..=1.0).contains(&r) {
        errors.push(format!("predictor.ratio_destroyed = {r} must be between 0 and 1"));
    }

    if let Some(suffix) = &config.report.suffix {
        if suffix.contains(['/', '\\']) {
            errors.push(format!("report.suffix '{suffix}' must not contain path separators"));
        }
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================

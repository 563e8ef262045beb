//! Run Configuration - every user choice of an emissions run as TOML
//!
//! Fields hold the user's spelling (`"HOLDER"`, `"DINS5"`, `12.5`). They are
//! turned into typed requests by `run_settings()` / `predictor_settings()`
//! before any record is touched, so a bad choice fails the run up front.

use super::defaults;
use crate::consumption::ConsumptionPolicy;
use crate::emissions::VehicleMode;
use crate::error::ConfigurationError;
use crate::factors::{
    EmissionFactorChoice, FuelLoadBasis, PollutantSelection, ScalarChoice, StructureFactorRequest,
    VehicleFactorRequest,
};
use crate::pipeline::RunSettings;
use crate::predictor::{PredictorSettings, DEFAULT_PREDICTED_INCIDENT};
use crate::selection::{AttributeFilter, DateWindow, FilterField, SelectionCriteria};
use crate::types::{parse_aggregate_keys, AggregateKey};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for an emissions run.
///
/// Load with `RunConfig::load()` which searches:
/// 1. `$SWEEP_CONFIG` env var
/// 2. `./sweep.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Structure emission factors, fuel loads and consumption
    #[serde(default)]
    pub structures: StructureConfig,

    /// Vehicle emission factors and count estimate
    #[serde(default)]
    pub vehicles: VehicleConfig,

    /// Aggregation and output files
    #[serde(default)]
    pub report: ReportConfig,

    /// Inventory record selection
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Synthetic damage scenarios
    #[serde(default)]
    pub predictor: PredictorConfig,
}

impl RunConfig {
    /// Load configuration using the standard search order:
    /// 1. `$SWEEP_CONFIG` environment variable
    /// 2. `./sweep.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded run config from SWEEP_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from SWEEP_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "SWEEP_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(defaults::LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded run config from ./sweep.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./sweep.toml, using defaults");
                }
            }
        }

        info!("No sweep.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents, path)
    }

    /// Two-pass parse of TOML text: unknown-key warnings, then serde, then
    /// `validate()`. `path` only labels errors.
    pub fn from_toml_str(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!(path = %path.display(), "{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every field, collecting all problems into one error.
    ///
    /// Runs the range checks plus a trial resolution of every symbolic
    /// choice, so a config that validates will also convert.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (mut errors, warnings) = super::validation::validate_ranges(self);
        for w in &warnings {
            warn!("{}", w);
        }

        let conversions = [
            self.structures.to_request().err(),
            self.vehicles.to_request().err(),
            self.vehicles.vehicle_mode().err(),
            self.vehicles.group_by_keys().err(),
            self.report.keys().err(),
            self.predictor.keys().err(),
            self.selection.criteria().err(),
        ];
        for e in conversions.into_iter().flatten() {
            let msg = e.to_string();
            if !errors.contains(&msg) {
                errors.push(msg);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Typed settings for an `estimate` run.
    pub fn run_settings(&self) -> Result<RunSettings, ConfigurationError> {
        Ok(RunSettings {
            structures: self.structures.to_request()?,
            vehicles: self.vehicles.to_request()?,
            vehicle_mode: self.vehicles.vehicle_mode()?,
            vehicle_group_by: self.vehicles.group_by_keys()?,
            aggregate_keys: self.report.keys()?,
        })
    }

    /// Typed settings for a `predict` run: the estimate settings with the
    /// predictor's own aggregate keys.
    pub fn predictor_run_settings(&self) -> Result<RunSettings, ConfigurationError> {
        Ok(RunSettings {
            aggregate_keys: self.predictor.keys()?,
            ..self.run_settings()?
        })
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config parse error ({}): {1}", .0.display())]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Shared Setting Shapes
// ============================================================================

/// A fuel-load factor: built-in table name or a direct value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarSetting {
    Value(f64),
    Named(String),
}

impl ScalarSetting {
    fn to_choice(&self, field: &'static str) -> Result<ScalarChoice, ConfigurationError> {
        match self {
            ScalarSetting::Value(v) => ScalarChoice::value(*v, field),
            ScalarSetting::Named(name) => ScalarChoice::parse_name(name, field),
        }
    }
}

/// `"ALL"`, `"DEFAULT"`, a single pollutant, or a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PollutantSetting {
    List(Vec<String>),
    Keyword(String),
}

fn pollutant_keyword(value: &str) -> Option<PollutantSelection> {
    match value.trim().to_uppercase().as_str() {
        "ALL" => Some(PollutantSelection::All),
        "DEFAULT" | "" => Some(PollutantSelection::Default),
        _ => None,
    }
}

fn pollutant_selection(setting: Option<&PollutantSetting>) -> PollutantSelection {
    match setting {
        None => PollutantSelection::Default,
        Some(PollutantSetting::Keyword(k)) => pollutant_keyword(k)
            .unwrap_or_else(|| PollutantSelection::List(vec![k.trim().to_string()])),
        // `["ALL"]` means the keyword, not a pollutant named ALL
        Some(PollutantSetting::List(list)) => match list.as_slice() {
            [only] => pollutant_keyword(only)
                .unwrap_or_else(|| PollutantSelection::List(list.clone())),
            _ => PollutantSelection::List(list.clone()),
        },
    }
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| (*s).to_string()).collect()
}

// ============================================================================
// [structures]
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureConfig {
    /// HOLDER, CARB or CUSTOM
    #[serde(default = "default_structure_efs")]
    pub emission_factors: String,

    /// CSV table used when `emission_factors = "CUSTOM"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_table: Option<PathBuf>,

    #[serde(default = "default_frame_factor")]
    pub frame_factor: ScalarSetting,

    #[serde(default = "default_contents_factor")]
    pub contents_factor: ScalarSetting,

    /// HOLDER, CARB, DINS3 or DINS5
    #[serde(default = "default_consumption")]
    pub consumption: String,

    #[serde(default)]
    pub fuel_load_basis: FuelLoadBasis,

    /// Floor area (ft²) for records without one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_floor_area: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pollutants: Option<PollutantSetting>,
}

fn default_structure_efs() -> String {
    defaults::STRUCTURE_EMISSION_FACTORS.to_string()
}
fn default_frame_factor() -> ScalarSetting {
    ScalarSetting::Named(defaults::FRAME_FACTOR.to_string())
}
fn default_contents_factor() -> ScalarSetting {
    ScalarSetting::Named(defaults::CONTENTS_FACTOR.to_string())
}
fn default_consumption() -> String {
    defaults::CONSUMPTION.to_string()
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            emission_factors: default_structure_efs(),
            custom_table: None,
            frame_factor: default_frame_factor(),
            contents_factor: default_contents_factor(),
            consumption: default_consumption(),
            fuel_load_basis: FuelLoadBasis::default(),
            default_floor_area: None,
            pollutants: None,
        }
    }
}

impl StructureConfig {
    pub fn to_request(&self) -> Result<StructureFactorRequest, ConfigurationError> {
        Ok(StructureFactorRequest {
            emission_factors: EmissionFactorChoice::parse(
                &self.emission_factors,
                self.custom_table.clone(),
                "structures.emission_factors",
            )?,
            frame: self.frame_factor.to_choice("structures.frame_factor")?,
            contents: self.contents_factor.to_choice("structures.contents_factor")?,
            consumption: ConsumptionPolicy::parse(&self.consumption)?,
            basis: self.fuel_load_basis,
            default_floor_area: self.default_floor_area,
            pollutants: pollutant_selection(self.pollutants.as_ref()),
        })
    }
}

// ============================================================================
// [vehicles]
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleConfig {
    #[serde(default = "default_vehicle_efs")]
    pub emission_factors: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_table: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pollutants: Option<PollutantSetting>,

    /// RATIO (vehicles per destroyed structure) or COUNT (run total)
    #[serde(default = "default_vehicle_mode")]
    pub mode: String,

    #[serde(default = "default_vehicle_value")]
    pub value: f64,

    /// Keys forming a ratio-mode vehicle unit
    #[serde(default = "default_group_by")]
    pub group_by: Vec<String>,
}

fn default_vehicle_efs() -> String {
    defaults::VEHICLE_EMISSION_FACTORS.to_string()
}
fn default_vehicle_mode() -> String {
    defaults::VEHICLE_MODE.to_string()
}
fn default_vehicle_value() -> f64 {
    crate::emissions::DEFAULT_VEHICLE_RATIO
}
fn default_group_by() -> Vec<String> {
    strings(defaults::VEHICLE_GROUP_BY)
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            emission_factors: default_vehicle_efs(),
            custom_table: None,
            pollutants: None,
            mode: default_vehicle_mode(),
            value: default_vehicle_value(),
            group_by: default_group_by(),
        }
    }
}

impl VehicleConfig {
    pub fn to_request(&self) -> Result<VehicleFactorRequest, ConfigurationError> {
        Ok(VehicleFactorRequest {
            emission_factors: EmissionFactorChoice::parse(
                &self.emission_factors,
                self.custom_table.clone(),
                "vehicles.emission_factors",
            )?,
            pollutants: pollutant_selection(self.pollutants.as_ref()),
        })
    }

    pub fn vehicle_mode(&self) -> Result<VehicleMode, ConfigurationError> {
        VehicleMode::parse(&self.mode, self.value)
    }

    /// Unit keys; an empty list means per incident.
    pub fn group_by_keys(&self) -> Result<Vec<AggregateKey>, ConfigurationError> {
        if self.group_by.is_empty() {
            return Ok(vec![AggregateKey::Incident]);
        }
        parse_aggregate_keys(&self.group_by)
    }
}

// ============================================================================
// [report]
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_aggregate_keys")]
    pub aggregate_keys: Vec<String>,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Run folder suffix; a local timestamp when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,

    /// Also write `Emissions_Spatial.geojson`
    #[serde(default = "default_true")]
    pub write_spatial: bool,
}

fn default_aggregate_keys() -> Vec<String> {
    strings(defaults::AGGREGATE_KEYS)
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(defaults::OUTPUT_DIR)
}
fn default_true() -> bool {
    true
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            aggregate_keys: default_aggregate_keys(),
            output_dir: default_output_dir(),
            suffix: None,
            write_spatial: true,
        }
    }
}

impl ReportConfig {
    pub fn keys(&self) -> Result<Vec<AggregateKey>, ConfigurationError> {
        parse_aggregate_keys(&self.aggregate_keys)
    }
}

// ============================================================================
// [selection]
// ============================================================================

/// Dates are quoted ISO strings (`start_date = "2020-08-01"`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Wildfire Name, Incident Number, County, Air Basin, Air District or
    /// CoAbDis Code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    #[serde(default)]
    pub values: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,

    /// AOI polygon GeoJSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aoi: Option<PathBuf>,
}

impl SelectionConfig {
    /// Attribute and date criteria. The AOI file is loaded by the caller.
    pub fn criteria(&self) -> Result<SelectionCriteria, ConfigurationError> {
        let attribute = self
            .field
            .as_deref()
            .map(FilterField::parse)
            .transpose()?
            .map(|field| AttributeFilter::new(field, &self.values));
        Ok(SelectionCriteria {
            attribute,
            window: DateWindow::new(self.start_date, self.end_date)?,
            aoi: None,
        })
    }
}

// ============================================================================
// [predictor]
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorConfig {
    #[serde(default = "default_ratio_destroyed")]
    pub ratio_destroyed: f64,

    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default = "default_incident_name")]
    pub incident_name: String,

    /// Scenario date; the run date when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident_date: Option<NaiveDate>,

    #[serde(default = "default_predictor_keys")]
    pub aggregate_keys: Vec<String>,
}

fn default_ratio_destroyed() -> f64 {
    defaults::RATIO_DESTROYED
}
fn default_seed() -> u64 {
    defaults::PREDICTOR_SEED
}
fn default_incident_name() -> String {
    DEFAULT_PREDICTED_INCIDENT.to_string()
}
fn default_predictor_keys() -> Vec<String> {
    strings(defaults::PREDICTOR_AGGREGATE_KEYS)
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            ratio_destroyed: default_ratio_destroyed(),
            seed: default_seed(),
            incident_name: default_incident_name(),
            incident_date: None,
            aggregate_keys: default_predictor_keys(),
        }
    }
}

impl PredictorConfig {
    pub fn keys(&self) -> Result<Vec<AggregateKey>, ConfigurationError> {
        parse_aggregate_keys(&self.aggregate_keys)
    }

    /// `today` stands in for an unset scenario date.
    pub fn settings(&self, today: NaiveDate) -> PredictorSettings {
        PredictorSettings {
            ratio_destroyed: self.ratio_destroyed,
            seed: self.seed,
            incident_name: self.incident_name.clone(),
            incident_date: self.incident_date.unwrap_or(today),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_AGGREGATE_KEYS;

    #[test]
    fn test_default_config_validates() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok(), "Default config must always validate");
    }

    #[test]
    fn test_empty_toml_produces_defaults() {
        let config: RunConfig = toml::from_str("").expect("empty TOML should parse");
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.structures.consumption, "DINS3");
        assert_eq!(config.vehicles.value, 1.44);
        assert_eq!(config.report.aggregate_keys, ["YEAR", "INCIDENT"]);
    }

    #[test]
    fn test_default_settings_match_run_defaults() {
        let settings = RunConfig::default().run_settings().unwrap();
        assert_eq!(settings, RunSettings::default());
        assert_eq!(settings.aggregate_keys, DEFAULT_AGGREGATE_KEYS.to_vec());
    }

    #[test]
    fn test_partial_toml_override() {
        let toml_str = r#"
[structures]
emission_factors = "CARB"
frame_factor = 12
contents_factor = "CARB"
consumption = "dins5"
fuel_load_basis = "per_structure"
pollutants = "ALL"

[vehicles]
mode = "COUNT"
value = 40
"#;
        let config: RunConfig = toml::from_str(toml_str).expect("partial TOML should parse");
        let settings = config.run_settings().unwrap();
        assert_eq!(settings.structures.emission_factors, EmissionFactorChoice::Carb);
        assert_eq!(settings.structures.frame, ScalarChoice::Value(12.0));
        assert_eq!(settings.structures.contents, ScalarChoice::Carb);
        assert_eq!(settings.structures.consumption, ConsumptionPolicy::Dins5);
        assert_eq!(settings.structures.basis, FuelLoadBasis::PerStructure);
        assert_eq!(settings.structures.pollutants, PollutantSelection::All);
        assert_eq!(settings.vehicle_mode, VehicleMode::Count(40.0));
        // untouched sections keep defaults
        assert_eq!(settings.vehicles.emission_factors, EmissionFactorChoice::Carb);
        assert_eq!(settings.aggregate_keys, DEFAULT_AGGREGATE_KEYS.to_vec());
    }

    #[test]
    fn test_pollutant_setting_shapes() {
        let single = pollutant_selection(Some(&PollutantSetting::Keyword("CO".to_string())));
        assert_eq!(single, PollutantSelection::List(vec!["CO".to_string()]));
        let list: RunConfig = toml::from_str("[vehicles]\npollutants = [\"CO\", \"NOx\"]\n").unwrap();
        assert_eq!(
            list.vehicles.to_request().unwrap().pollutants,
            PollutantSelection::List(vec!["CO".to_string(), "NOx".to_string()])
        );
        assert_eq!(pollutant_selection(None), PollutantSelection::Default);
    }

    #[test]
    fn test_keyword_inside_single_element_list() {
        let config: RunConfig =
            toml::from_str("[structures]\npollutants = [\"all\"]\n\n[vehicles]\npollutants = [\"Default\"]\n")
                .unwrap();
        assert_eq!(config.structures.to_request().unwrap().pollutants, PollutantSelection::All);
        assert_eq!(config.vehicles.to_request().unwrap().pollutants, PollutantSelection::Default);
        assert!(config.validate().is_ok());

        // only a lone keyword is special
        let mixed = pollutant_selection(Some(&PollutantSetting::List(vec![
            "ALL".to_string(),
            "CO".to_string(),
        ])));
        assert!(matches!(mixed, PollutantSelection::List(_)));
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = RunConfig::default();
        config.structures.consumption = "DINS4".to_string();
        config.structures.emission_factors = "CUSTOM".to_string();
        config.vehicles.mode = "PER_ACRE".to_string();
        config.report.aggregate_keys = vec!["ZIP".to_string()];
        let Err(ConfigError::Validation(errors)) = config.validate() else {
            panic!("expected validation failure");
        };
        assert!(errors.iter().any(|e| e.contains("DINS4")));
        assert!(errors.iter().any(|e| e.contains("CUSTOM")));
        assert!(errors.iter().any(|e| e.contains("PER_ACRE")));
        assert!(errors.iter().any(|e| e.contains("ZIP")));
    }

    #[test]
    fn test_inverted_date_window_rejected() {
        let toml_str = r#"
[selection]
start_date = "2021-01-01"
end_date = "2020-01-01"
"#;
        let err = RunConfig::from_toml_str(toml_str, Path::new("test.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_selection_criteria() {
        let toml_str = r#"
[selection]
field = "County"
values = ["Butte", "Napa"]
start_date = "2020-08-01"
"#;
        let config = RunConfig::from_toml_str(toml_str, Path::new("test.toml")).unwrap();
        let criteria = config.selection.criteria().unwrap();
        assert_eq!(criteria.attribute.map(|a| a.field), Some(FilterField::County));
        assert!(!criteria.window.is_open());
        assert!(criteria.aoi.is_none());
    }

    #[test]
    fn test_predictor_settings() {
        let config = RunConfig::default();
        let today = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let settings = config.predictor.settings(today);
        assert_eq!(settings.seed, 42);
        assert_eq!(settings.incident_date, today);
        assert_eq!(settings.incident_name, DEFAULT_PREDICTED_INCIDENT);
        let run = config.predictor_run_settings().unwrap();
        assert_eq!(run.aggregate_keys, vec![AggregateKey::AoiIndex]);
    }

    #[test]
    fn test_roundtrip_toml() {
        let mut original = RunConfig::default();
        original.structures.frame_factor = ScalarSetting::Value(9.5);
        original.structures.pollutants = Some(PollutantSetting::List(vec!["CO".to_string()]));
        original.selection.start_date = NaiveDate::from_ymd_opt(2020, 8, 1);
        let toml_str = original.to_toml().expect("serialization should work");
        let roundtripped: RunConfig = toml::from_str(&toml_str).expect("deserialization should work");
        assert_eq!(original, roundtripped);
    }

    #[test]
    fn test_all_sections_serialize() {
        let toml_str = RunConfig::default().to_toml().unwrap();
        for section in ["[structures]", "[vehicles]", "[report]", "[selection]", "[predictor]"] {
            assert!(toml_str.contains(section), "Missing {section} section");
        }
    }
}

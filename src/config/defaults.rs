//! Run-wide default constants.
//!
//! Values used when neither the config file nor the command line sets a
//! field. Grouped by config section.

// ============================================================================
// Loading
// ============================================================================

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "SWEEP_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "sweep.toml";

// ============================================================================
// [structures]
// ============================================================================

pub const STRUCTURE_EMISSION_FACTORS: &str = "HOLDER";
pub const FRAME_FACTOR: &str = "HOLDER";
pub const CONTENTS_FACTOR: &str = "HOLDER";
pub const CONSUMPTION: &str = "DINS3";

/// Floor areas above this (ft²) are accepted but warned about.
pub const SUSPICIOUS_FLOOR_AREA_FT2: f64 = 200_000.0;

// ============================================================================
// [vehicles]
// ============================================================================

pub const VEHICLE_EMISSION_FACTORS: &str = "CARB";
pub const VEHICLE_MODE: &str = "RATIO";

/// Vehicles per destroyed structure above this are warned about.
pub const SUSPICIOUS_VEHICLE_RATIO: f64 = 10.0;

pub const VEHICLE_GROUP_BY: &[&str] = &["INCIDENT"];

// ============================================================================
// [report]
// ============================================================================

pub const AGGREGATE_KEYS: &[&str] = &["YEAR", "INCIDENT"];

/// Directory run folders are created in.
pub const OUTPUT_DIR: &str = ".";

/// Local-time format of the run folder suffix when none is configured.
pub const SUFFIX_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

// ============================================================================
// [predictor]
// ============================================================================

/// Every candidate is destroyed unless a ratio is configured.
pub const RATIO_DESTROYED: f64 = 1.0;

pub const PREDICTOR_SEED: u64 = 42;

pub const PREDICTOR_AGGREGATE_KEYS: &[&str] = &["AOI_INDEX"];

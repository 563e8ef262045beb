//! Run Configuration Module
//!
//! Every user choice of an emissions run, loaded from a TOML file.
//!
//! ## Loading Order
//!
//! 1. `SWEEP_CONFIG` environment variable (path to TOML file)
//! 2. `sweep.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! The config is a plain value passed to whoever needs it:
//!
//! ```ignore
//! let config = RunConfig::load();
//! let settings = config.run_settings()?;
//! let output = run_estimate(&records, &settings)?;
//! ```

mod run_config;
pub mod defaults;
pub mod validation;

pub use run_config::*;

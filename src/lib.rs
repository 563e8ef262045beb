//! SWEEP: Structure Wildfire Emissions Estimator and Predictor
//!
//! Estimates air-pollutant emissions from structures and vehicles burned in
//! wildfires, starting from a damage-inspection inventory.
//!
//! ## Architecture
//!
//! - **Factor Resolver** (`factors`): symbolic choices to immutable factor sets
//! - **Consumption Model** (`consumption`): damage category to fuel fraction
//! - **Emissions Calculator** (`emissions`): per-structure and vehicle rows
//! - **Aggregator** (`aggregate`): grouped totals
//! - **Pipeline** (`pipeline`): one run from records to outputs
//!
//! Around the engine: `inventory` loading, `selection`, the `predictor`
//! scenario generator, `report` writing and the TOML `config`.

pub mod aggregate;
pub mod config;
pub mod consumption;
pub mod emissions;
pub mod error;
pub mod factors;
pub mod inventory;
pub mod pipeline;
pub mod predictor;
pub mod report;
pub mod selection;
pub mod tabular;
pub mod types;

// Re-export run configuration
pub use config::RunConfig;

// Re-export the run entry points
pub use error::{SweepError, Result};
pub use pipeline::{run_estimate, RunOutput, RunSettings};

// Re-export commonly used types
pub use types::{
    AggregateKey, AggregateRow, AggregateTable, DamageCategory, EmissionRow, EmissionTable,
    ExclusionReport, StructureRecord, VehicleTable,
};

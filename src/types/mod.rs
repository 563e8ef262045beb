//! Shared data structures for structure-fire emissions estimation
//!
//! - `StructureRecord` / `DamageCategory`: inventory rows entering the engine
//! - `EmissionRow` / `EmissionTable`: per-structure emissions
//! - `VehicleEstimate` / `VehicleTable`: per-unit vehicle emissions
//! - `AggregateKey` / `AggregateRow` / `AggregateTable`: grouped summaries
//! - `ExclusionReport`: rows dropped by data checks

mod emissions;
mod keys;
mod structure;

pub use emissions::*;
pub use keys::*;
pub use structure::*;

//! Pipeline Orchestrator
//!
//! ```text
//! Configured  settings validated, symbolic choices already enums
//! Resolved    structure + vehicle FactorSets built once
//! Computed    per-structure rows (rayon), vehicle counts and rows
//! Aggregated  structure summary + vehicle summary
//! Done        RunOutput returned
//! ```
//!
//! Any error aborts the run and is returned as-is; no partial output is ever
//! handed back. Given the same records and settings the outputs are identical.

mod state;

pub use state::RunState;

use crate::aggregate::aggregate;
use crate::emissions::{
    compute_structure_emissions, compute_vehicle_emissions, estimate_vehicles, VehicleMode,
};
use crate::error::SweepError;
use crate::factors::{
    resolve_structure_factors, resolve_vehicle_factors, StructureFactorRequest,
    VehicleFactorRequest,
};
use crate::types::{
    AggregateKey, AggregateTable, EmissionTable, ExclusionReport, StructureRecord, VehicleTable,
    DEFAULT_AGGREGATE_KEYS,
};
use std::time::Instant;
use tracing::{debug, info};

/// Fully-typed settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub structures: StructureFactorRequest,
    pub vehicles: VehicleFactorRequest,
    pub vehicle_mode: VehicleMode,
    /// Unit over which ratio-mode vehicle counts are fixed
    pub vehicle_group_by: Vec<AggregateKey>,
    pub aggregate_keys: Vec<AggregateKey>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            structures: StructureFactorRequest::default(),
            vehicles: VehicleFactorRequest::default(),
            vehicle_mode: VehicleMode::default(),
            vehicle_group_by: vec![AggregateKey::Incident],
            aggregate_keys: DEFAULT_AGGREGATE_KEYS.to_vec(),
        }
    }
}

impl RunSettings {
    /// Keys that identify a vehicle unit: none in count mode.
    pub fn vehicle_unit_keys(&self) -> &[AggregateKey] {
        match self.vehicle_mode {
            VehicleMode::Ratio(_) => self.vehicle_group_by.as_slice(),
            VehicleMode::Count(_) => &[],
        }
    }
}

/// Everything a successful run produces.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunOutput {
    pub emissions: EmissionTable,
    pub aggregate: AggregateTable,
    pub vehicles: VehicleTable,
    /// Vehicle emissions summarised per vehicle unit
    pub vehicle_summary: AggregateTable,
    pub exclusions: ExclusionReport,
}

/// Single-use run driver that records its state transitions.
pub struct EstimateRun<'a> {
    settings: &'a RunSettings,
    state: RunState,
    started: Instant,
}

impl<'a> EstimateRun<'a> {
    pub fn new(settings: &'a RunSettings) -> Self {
        Self {
            settings,
            state: RunState::Configured,
            started: Instant::now(),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn advance(&mut self) {
        let next = self.state.next();
        debug!(
            from = %self.state,
            to = %next,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "Run state transition"
        );
        self.state = next;
    }

    /// Drive the run to `Done`.
    pub fn execute(mut self, records: &[StructureRecord]) -> Result<RunOutput, SweepError> {
        let settings = self.settings;
        info!(records = records.len(), "Starting emissions run");

        let structure_factors = resolve_structure_factors(&settings.structures)?;
        let vehicle_factors = resolve_vehicle_factors(&settings.vehicles)?;
        self.advance();

        let structures = compute_structure_emissions(records, &structure_factors)?;
        let unit_keys = settings.vehicle_unit_keys();
        let estimates = estimate_vehicles(&structures.table, settings.vehicle_mode, unit_keys);
        let vehicles = compute_vehicle_emissions(&estimates, &vehicle_factors);
        self.advance();

        let summary = aggregate(
            &structures.table.rows,
            &settings.aggregate_keys,
            &structures.table.pollutants,
        );
        let vehicle_summary = aggregate(&vehicles.rows, unit_keys, &vehicles.pollutants);
        self.advance();

        let output = RunOutput {
            emissions: structures.table,
            aggregate: summary,
            vehicles,
            vehicle_summary,
            exclusions: structures.exclusions,
        };
        self.advance();

        info!(
            rows = output.emissions.rows.len(),
            groups = output.aggregate.rows.len(),
            vehicles = output.vehicles.total_vehicles(),
            excluded = output.exclusions.count(),
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "Emissions run complete"
        );
        Ok(output)
    }
}

/// Run the full estimate over a filtered structure table.
pub fn run_estimate(
    records: &[StructureRecord],
    settings: &RunSettings,
) -> Result<RunOutput, SweepError> {
    EstimateRun::new(settings).execute(records)
}

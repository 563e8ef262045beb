//! Error taxonomy for an emissions run
//!
//! - `ConfigurationError`: an invalid or unresolvable user choice. Raised
//!   before any row is processed.
//! - `DataValidationError`: a record fails a required-field or domain check.
//!   Row-level failures are collected into the exclusion report; only a run
//!   where nothing survives fails with it.
//! - `ComputationError`: an arithmetic impossibility after resolution. Its
//!   occurrence means a `FactorSet` invariant was broken.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("unknown {field} choice '{value}' (expected one of: {expected})")]
    UnknownChoice {
        field: &'static str,
        value: String,
        expected: String,
    },

    #[error("{field} must be a positive finite number, got {value}")]
    NonPositiveValue { field: &'static str, value: f64 },

    #[error("{field} must be a non-negative finite number, got {value}")]
    NegativeValue { field: &'static str, value: f64 },

    #[error("{field} = {value} is out of range ({expected})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },

    #[error("{field} is CUSTOM but no custom factor table was supplied")]
    MissingCustomTable { field: &'static str },

    #[error("failed to read factor table {path}: {source}")]
    CustomTableIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("factor table {path} is missing required column {column}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("factor table {path} line {line}: rate for {pollutant} must be a non-negative number, got '{value}'")]
    InvalidRate {
        path: PathBuf,
        line: usize,
        pollutant: String,
        value: String,
    },

    #[error("pollutant '{pollutant}' is not available in the {table} factor table (available: {available})")]
    UnknownPollutant {
        pollutant: String,
        table: String,
        available: String,
    },

    #[error("pollutant selection for {table} resolved to no pollutants")]
    EmptyPollutantSelection { table: String },

    #[error("unknown aggregate key '{key}' (expected one of: {allowed})")]
    UnknownAggregateKey { key: String, allowed: String },

    #[error("invalid date window: start {start} is after end {end}")]
    InvalidDateWindow { start: String, end: String },
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DataValidationError {
    #[error("record {record_id}: required field {field} is missing")]
    MissingField {
        record_id: String,
        field: &'static str,
    },

    #[error("record {record_id}: unrecognised damage category '{value}' (expected No Damage, Affected, Minor, Major or Destroyed)")]
    UnknownDamageCategory { record_id: String, value: String },

    #[error("record {record_id}: {field} = {value} is out of range ({expected})")]
    OutOfRange {
        record_id: String,
        field: &'static str,
        value: f64,
        expected: &'static str,
    },

    #[error("all {total} input records were excluded by data validation")]
    NothingSurvived { total: usize },
}

impl DataValidationError {
    /// Identifier of the offending record, when the error is row-level.
    pub fn record_id(&self) -> Option<&str> {
        match self {
            DataValidationError::MissingField { record_id, .. }
            | DataValidationError::UnknownDamageCategory { record_id, .. }
            | DataValidationError::OutOfRange { record_id, .. } => Some(record_id),
            DataValidationError::NothingSurvived { .. } => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ComputationError {
    #[error("emission factor for pollutant '{pollutant}' missing from resolved factor set")]
    MissingFactor { pollutant: String },

    #[error("record {record_id}: non-finite emission for {pollutant} ({value})")]
    NonFinite {
        record_id: String,
        pollutant: String,
        value: f64,
    },
}

/// Top-level error surfaced by a run.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("data validation error: {0}")]
    DataValidation(#[from] DataValidationError),

    #[error("computation error: {0}")]
    Computation(#[from] ComputationError),
}

pub type Result<T, E = SweepError> = std::result::Result<T, E>;

//! Predictor: synthetic damage assignment
//!
//! Turns a table of candidate structures (typically parcel points inside a
//! hypothetical burn perimeter) into an inventory with damage filled in, so a
//! "what if this area burned" scenario can run through the same engine.
//!
//! Assignment uses a `StdRng` seeded from the run's seed: the same candidates,
//! ratio and seed always give the same destroyed set.

use crate::error::ConfigurationError;
use crate::types::{DamageCategory, StructureRecord};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

/// Incident name stamped on candidates that carry none.
pub const DEFAULT_PREDICTED_INCIDENT: &str = "PREDICTED";

#[derive(Debug, Clone, PartialEq)]
pub struct PredictorSettings {
    /// Share of candidates marked destroyed, in [0, 1]
    pub ratio_destroyed: f64,
    pub seed: u64,
    pub incident_name: String,
    /// Date stamped on candidates that carry none
    pub incident_date: NaiveDate,
}

/// Number of candidates to destroy: nearest integer, ties away from zero.
pub fn destroyed_count(ratio: f64, candidates: usize) -> usize {
    (ratio * candidates as f64).round() as usize
}

/// Assign `destroyed` to a seeded random subset and `No Damage` to the rest.
///
/// Candidates missing an incident name or date get the scenario's; a missing
/// AOI index becomes 0 (the whole scenario is one area).
pub fn assign_damage(
    mut candidates: Vec<StructureRecord>,
    settings: &PredictorSettings,
) -> Result<Vec<StructureRecord>, ConfigurationError> {
    let ratio = settings.ratio_destroyed;
    if !ratio.is_finite() || !(0.0..=1.0).contains(&ratio) {
        return Err(ConfigurationError::OutOfRange {
            field: "predictor.ratio_destroyed",
            value: ratio,
            expected: "0 to 1",
        });
    }

    let n = candidates.len();
    let k = destroyed_count(ratio, n).min(n);
    let mut rng = StdRng::seed_from_u64(settings.seed);
    let mut destroyed = vec![false; n];
    for idx in rand::seq::index::sample(&mut rng, n, k) {
        destroyed[idx] = true;
    }

    for (record, is_destroyed) in candidates.iter_mut().zip(destroyed) {
        let category = if is_destroyed {
            DamageCategory::Destroyed
        } else {
            DamageCategory::None
        };
        record.damage = Some(category.label().to_string());
        if record.incident_name.trim().is_empty() {
            record.incident_name.clone_from(&settings.incident_name);
        }
        if record.incident_date.is_none() {
            record.incident_date = Some(settings.incident_date);
        }
        if record.aoi_index.is_none() {
            record.aoi_index = Some(0);
        }
    }

    info!(
        candidates = n,
        destroyed = k,
        ratio,
        seed = settings.seed,
        "Assigned synthetic damage"
    );
    Ok(candidates)
}

//! Consumption Model
//!
//! Maps a structure's damage category to the fraction of its fuel load that
//! burned. Four fixed policies over the five DINS bands, least damaged first:
//!
//! | Policy | none | affected (1-9%) | minor (10-25%) | major (26-50%) | destroyed (>50%) |
//! |--------|------|-----------------|----------------|----------------|------------------|
//! | HOLDER | 0.0  | 0.0             | 0.0            | 0.80           | 0.80             |
//! | CARB   | 0.0  | 0.07            | 0.07           | 0.07           | 0.07             |
//! | DINS3  | 0.0  | 0.0             | 0.0            | 0.50           | 0.95             |
//! | DINS5  | 0.0  | 0.05            | 0.175          | 0.38           | 0.755            |
//!
//! HOLDER follows Holder et al. (2023): anything major or worse is 80%
//! consumed. CARB is the flat 7% of the 1999 inventory method. DINS3 and DINS5
//! use the midpoints of the DINS damage-percentage bins, so DINS5 gives 5% to
//! affected (1-9%) and 17.5% to minor (10-25%).

use crate::error::{ConfigurationError, DataValidationError};
use crate::types::{DamageCategory, StructureRecord};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConsumptionPolicy {
    Holder,
    Carb,
    #[default]
    Dins3,
    Dins5,
}

impl ConsumptionPolicy {
    pub const ALL: [ConsumptionPolicy; 4] = [
        ConsumptionPolicy::Holder,
        ConsumptionPolicy::Carb,
        ConsumptionPolicy::Dins3,
        ConsumptionPolicy::Dins5,
    ];

    /// Resolve a policy name, case-insensitively.
    pub fn parse(name: &str) -> Result<Self, ConfigurationError> {
        match name.trim().to_uppercase().as_str() {
            "HOLDER" => Ok(ConsumptionPolicy::Holder),
            "CARB" => Ok(ConsumptionPolicy::Carb),
            "DINS3" => Ok(ConsumptionPolicy::Dins3),
            "DINS5" => Ok(ConsumptionPolicy::Dins5),
            _ => Err(ConfigurationError::UnknownChoice {
                field: "consumption policy",
                value: name.to_string(),
                expected: "HOLDER, CARB, DINS3, DINS5".to_string(),
            }),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ConsumptionPolicy::Holder => "HOLDER",
            ConsumptionPolicy::Carb => "CARB",
            ConsumptionPolicy::Dins3 => "DINS3",
            ConsumptionPolicy::Dins5 => "DINS5",
        }
    }

    /// Consumption fraction for a damage category under this policy.
    pub fn fraction(self, damage: DamageCategory) -> f64 {
        use DamageCategory as D;
        match (self, damage) {
            (_, D::None) => 0.0,

            (ConsumptionPolicy::Holder, D::Affected | D::Minor) => 0.0,
            (ConsumptionPolicy::Holder, D::Major | D::Destroyed) => 0.80,

            (ConsumptionPolicy::Carb, _) => 0.07,

            (ConsumptionPolicy::Dins3, D::Affected | D::Minor) => 0.0,
            (ConsumptionPolicy::Dins3, D::Major) => 0.50,
            (ConsumptionPolicy::Dins3, D::Destroyed) => 0.95,

            (ConsumptionPolicy::Dins5, D::Affected) => 0.05,
            (ConsumptionPolicy::Dins5, D::Minor) => 0.175,
            (ConsumptionPolicy::Dins5, D::Major) => 0.38,
            (ConsumptionPolicy::Dins5, D::Destroyed) => 0.755,
        }
    }

    /// Classify a record and return its category and consumption fraction.
    ///
    /// A blank damage cell or a label outside the five recognised categories
    /// is a `DataValidationError` naming the record.
    pub fn apply(
        self,
        record: &StructureRecord,
    ) -> Result<(DamageCategory, f64), DataValidationError> {
        let label = record
            .damage
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| DataValidationError::MissingField {
                record_id: record.id.clone(),
                field: "damage",
            })?;
        let category =
            DamageCategory::parse(label).ok_or_else(|| DataValidationError::UnknownDamageCategory {
                record_id: record.id.clone(),
                value: label.to_string(),
            })?;
        Ok((category, self.fraction(category)))
    }
}

impl std::fmt::Display for ConsumptionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DamageCategory as D;

    fn record(damage: Option<&str>) -> StructureRecord {
        StructureRecord {
            id: "S-1".to_string(),
            damage: damage.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_full_policy_table() {
        let expected: [(ConsumptionPolicy, [f64; 5]); 4] = [
            (ConsumptionPolicy::Holder, [0.0, 0.0, 0.0, 0.80, 0.80]),
            (ConsumptionPolicy::Carb, [0.0, 0.07, 0.07, 0.07, 0.07]),
            (ConsumptionPolicy::Dins3, [0.0, 0.0, 0.0, 0.50, 0.95]),
            (ConsumptionPolicy::Dins5, [0.0, 0.05, 0.175, 0.38, 0.755]),
        ];
        for (policy, row) in expected {
            for (cat, want) in D::ALL.iter().zip(row) {
                assert_eq!(policy.fraction(*cat), want, "{policy} / {cat:?}");
            }
        }
    }

    #[test]
    fn test_fractions_within_unit_interval() {
        for policy in ConsumptionPolicy::ALL {
            for cat in D::ALL {
                let f = policy.fraction(cat);
                assert!((0.0..=1.0).contains(&f));
            }
        }
    }

    #[test]
    fn test_parse_policy_case_insensitive() {
        assert_eq!(ConsumptionPolicy::parse("dins5").unwrap(), ConsumptionPolicy::Dins5);
        assert_eq!(ConsumptionPolicy::parse(" Holder ").unwrap(), ConsumptionPolicy::Holder);
    }

    #[test]
    fn test_parse_unknown_policy_fails() {
        let err = ConsumptionPolicy::parse("DINS4").unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownChoice { .. }));
        assert!(err.to_string().contains("DINS4"));
    }

    #[test]
    fn test_apply_dins_label() {
        let (cat, f) = ConsumptionPolicy::Holder
            .apply(&record(Some("Destroyed (>50%)")))
            .unwrap();
        assert_eq!(cat, D::Destroyed);
        assert_eq!(f, 0.80);
    }

    #[test]
    fn test_apply_dins_labels_every_policy() {
        let labels = [
            "No Damage",
            "Affected (1-9%)",
            "Minor (10-25%)",
            "Major (26-50%)",
            "Destroyed (>50%)",
        ];
        let expected: [(ConsumptionPolicy, [f64; 5]); 4] = [
            (ConsumptionPolicy::Holder, [0.0, 0.0, 0.0, 0.80, 0.80]),
            (ConsumptionPolicy::Carb, [0.0, 0.07, 0.07, 0.07, 0.07]),
            (ConsumptionPolicy::Dins3, [0.0, 0.0, 0.0, 0.50, 0.95]),
            (ConsumptionPolicy::Dins5, [0.0, 0.05, 0.175, 0.38, 0.755]),
        ];
        for (policy, row) in expected {
            for (label, want) in labels.iter().zip(row) {
                let (_, f) = policy.apply(&record(Some(label))).unwrap();
                assert_eq!(f, want, "{policy} / {label}");
            }
        }
    }

    #[test]
    fn test_dins5_affected_below_minor() {
        let (cat, f) = ConsumptionPolicy::Dins5
            .apply(&record(Some("Affected (1-9%)")))
            .unwrap();
        assert_eq!((cat, f), (D::Affected, 0.05));
        let (cat, f) = ConsumptionPolicy::Dins5
            .apply(&record(Some("Minor (10-25%)")))
            .unwrap();
        assert_eq!((cat, f), (D::Minor, 0.175));
    }

    #[test]
    fn test_apply_unknown_category_fails() {
        let err = ConsumptionPolicy::Dins3
            .apply(&record(Some("Inaccessible")))
            .unwrap_err();
        assert_eq!(
            err,
            DataValidationError::UnknownDamageCategory {
                record_id: "S-1".to_string(),
                value: "Inaccessible".to_string(),
            }
        );
    }

    #[test]
    fn test_apply_missing_damage_fails() {
        for damage in [None, Some("   ")] {
            let err = ConsumptionPolicy::Dins3.apply(&record(damage)).unwrap_err();
            assert!(matches!(err, DataValidationError::MissingField { field: "damage", .. }));
        }
    }
}

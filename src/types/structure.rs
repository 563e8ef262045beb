//! Structure inventory records (one row of the burned-structures database)

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

// ============================================================================
// Damage Category
// ============================================================================

/// Ordinal DINS damage classification of a single structure.
///
/// Ordering follows the DINS percentage bands:
/// no damage < affected (1-9%) < minor (10-25%) < major (26-50%) < destroyed (>50%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DamageCategory {
    None,
    /// 1-9%
    Affected,
    /// 10-25%
    Minor,
    Major,
    Destroyed,
}

impl DamageCategory {
    pub const ALL: [DamageCategory; 5] = [
        DamageCategory::None,
        DamageCategory::Affected,
        DamageCategory::Minor,
        DamageCategory::Major,
        DamageCategory::Destroyed,
    ];

    /// Parse an inventory damage label.
    ///
    /// Accepts the DINS survey wording (`"Destroyed (>50%)"`, `"No Damage"`)
    /// as well as the bare category words, case-insensitively. Returns `None`
    /// for anything else.
    pub fn parse(label: &str) -> Option<Self> {
        let lower = label.trim().to_lowercase();
        // DINS labels carry a percentage band after the word
        let word = lower.split('(').next().unwrap_or("").trim();
        match word {
            "no damage" | "none" | "no" => Some(DamageCategory::None),
            "minor" => Some(DamageCategory::Minor),
            "affected" => Some(DamageCategory::Affected),
            "major" => Some(DamageCategory::Major),
            "destroyed" => Some(DamageCategory::Destroyed),
            _ => None,
        }
    }

    /// Canonical DINS label, as written in reports.
    pub fn label(self) -> &'static str {
        match self {
            DamageCategory::None => "No Damage",
            DamageCategory::Affected => "Affected (1-9%)",
            DamageCategory::Minor => "Minor (10-25%)",
            DamageCategory::Major => "Major (26-50%)",
            DamageCategory::Destroyed => "Destroyed (>50%)",
        }
    }
}

impl std::fmt::Display for DamageCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ============================================================================
// Location
// ============================================================================

/// Point location of a structure (WGS84 / NAD83 longitude, latitude).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
}

impl Location {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

// ============================================================================
// Structure Record
// ============================================================================

/// One damaged or destroyed structure as handed over by the selection stage.
///
/// `damage` is kept as the raw inventory label so the consumption model can
/// report unrecognised values against the record that carried them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StructureRecord {
    /// Inventory global identifier
    pub id: String,
    pub incident_name: String,
    #[serde(default)]
    pub incident_number: String,
    #[serde(default)]
    pub incident_date: Option<NaiveDate>,
    /// Raw damage label; `None` when the inventory cell was blank
    #[serde(default)]
    pub damage: Option<String>,
    #[serde(default)]
    pub county: String,
    #[serde(default)]
    pub air_basin: String,
    #[serde(default)]
    pub air_district: String,
    #[serde(default)]
    pub district_id: String,
    /// Combined county / air basin / district code
    #[serde(default)]
    pub coabdis: String,
    #[serde(default)]
    pub location: Option<Location>,
    /// Floor area in square feet
    #[serde(default)]
    pub floor_area: Option<f64>,
    /// Parcel use category (e.g. `SFSS`, `COMMS`)
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub structure_type: Option<String>,
    /// Index of the AOI polygon the record fell in, when spatially selected
    #[serde(default)]
    pub aoi_index: Option<u32>,
}

impl StructureRecord {
    /// Parsed damage category, if the label is present and recognised.
    pub fn damage_category(&self) -> Option<DamageCategory> {
        self.damage.as_deref().and_then(DamageCategory::parse)
    }

    pub fn year(&self) -> Option<i32> {
        self.incident_date.map(|d| d.year())
    }

    pub fn month(&self) -> Option<u32> {
        self.incident_date.map(|d| d.month())
    }
}

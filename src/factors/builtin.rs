//! Built-in emission-factor tables and fuel-load scalars.
//!
//! Structure factors are grams of pollutant per kilogram of structure fuel
//! consumed. Vehicle factors are grams per kilogram of vehicle mass burned;
//! they are scaled to a whole-vehicle fire with [`VEHICLE_FUEL_MASS_KG`].
//!
//! These tables ship as run defaults. Inventory submissions should pin the
//! agency's current table through a custom factor file.

/// Pounds to kilograms. Floor-area fuel loads are tabulated in lb/ft².
pub const POUND_KG: f64 = 0.453_592_37;

/// Burnable mass of one passenger vehicle (kg).
pub const VEHICLE_FUEL_MASS_KG: f64 = 461.0;

/// Pollutants estimated for structures when no selection is given.
pub const DEFAULT_STRUCTURE_POLLUTANTS: [&str; 5] = ["CO", "NOx", "SOx", "PM", "TOG"];

/// Pollutants estimated for vehicles when no selection is given.
pub const DEFAULT_VEHICLE_POLLUTANTS: [&str; 4] = ["CO", "NOx", "SOx", "PM"];

// ============================================================================
// Structure Emission Factors (g/kg)
// ============================================================================

/// Holder et al. (2023) structure-fire emission factors.
pub const HOLDER_STRUCTURE_EFS: &[(&str, f64)] = &[
    ("CO", 36.0),
    ("CO2", 1520.0),
    ("CH4", 3.1),
    ("NOx", 2.6),
    ("SOx", 0.71),
    ("NH3", 1.1),
    ("HCN", 0.82),
    ("PM", 12.0),
    ("PM2.5", 10.5),
    ("BC", 0.9),
    ("TOG", 9.5),
    ("Benzene", 0.62),
    ("Formaldehyde", 0.38),
];

/// CARB 1999 inventory structure-fire emission factors.
pub const CARB_STRUCTURE_EFS: &[(&str, f64)] = &[
    ("CO", 30.0),
    ("NOx", 0.7),
    ("SOx", 0.25),
    ("PM", 5.4),
    ("PM10", 5.2),
    ("PM2.5", 4.9),
    ("TOG", 5.5),
    ("ROG", 4.8),
];

// ============================================================================
// Vehicle Emission Factors (g/kg of vehicle mass)
// ============================================================================

pub const HOLDER_VEHICLE_EFS: &[(&str, f64)] = &[
    ("CO", 63.0),
    ("CO2", 1700.0),
    ("CH4", 2.4),
    ("NOx", 2.9),
    ("SOx", 0.95),
    ("PM", 28.0),
    ("PM2.5", 24.0),
    ("TOG", 12.0),
];

pub const CARB_VEHICLE_EFS: &[(&str, f64)] = &[
    ("CO", 62.5),
    ("NOx", 2.0),
    ("SOx", 0.6),
    ("PM", 17.5),
    ("PM10", 17.0),
    ("PM2.5", 16.0),
    ("TOG", 8.5),
    ("ROG", 7.5),
];

// ============================================================================
// Fuel-Load Scalars
// ============================================================================
//
// Floor-area basis: pounds of fuel per square foot of floor area.
// Per-structure basis: the same numbers are read as kg per structure.

/// Frame fuel load, Holder et al. (2023).
pub const HOLDER_FRAME_FACTOR: f64 = 31.07;
/// Frame fuel load, CARB 1999.
pub const CARB_FRAME_FACTOR: f64 = 13.34;
/// Contents fuel load, Holder et al. (2023).
pub const HOLDER_CONTENTS_FACTOR: f64 = 5.87;
/// Contents fuel load for residential and unlisted categories, CARB 1999.
pub const CARB_CONTENTS_FACTOR: f64 = 7.909;
/// Contents fuel load for commercial, school and hospital categories, CARB 1999.
pub const CARB_CONTENTS_FACTOR_NONRESIDENTIAL: f64 = 8.636;
/// Parcel categories that take the non-residential CARB contents load.
pub const CARB_NONRESIDENTIAL_CATEGORIES: [&str; 4] = ["COMMS", "COMSS", "SCH", "HP"];

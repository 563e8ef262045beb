//! Aggregator
//!
//! Groups emission rows by an ordered key list and sums each pollutant
//! column. Grouping goes through a `BTreeMap` keyed by the key-value tuple, so
//! output order is the lexical order of that tuple and independent of input
//! order. Sums are plain additions: total mass per pollutant is conserved.

use crate::types::{
    AggregateKey, AggregateRow, AggregateTable, EmissionRow, KeyValue, VehicleEmissionRow,
};
use std::collections::BTreeMap;
use tracing::info;

/// A row that can be grouped and summed.
pub trait Aggregatable {
    fn key_value(&self, key: AggregateKey) -> KeyValue;
    fn emissions(&self) -> &[f64];
    /// Contribution to the group's `count` column
    fn count(&self) -> u64;
    /// Contribution to the group's `damaged` column
    fn damaged(&self) -> u64;
}

impl Aggregatable for EmissionRow {
    fn key_value(&self, key: AggregateKey) -> KeyValue {
        key.value_of(self)
    }

    fn emissions(&self) -> &[f64] {
        &self.emissions_g
    }

    fn count(&self) -> u64 {
        1
    }

    fn damaged(&self) -> u64 {
        u64::from(self.consumption_fraction > 0.0)
    }
}

impl Aggregatable for VehicleEmissionRow {
    fn key_value(&self, key: AggregateKey) -> KeyValue {
        self.unit_value(key)
    }

    fn emissions(&self) -> &[f64] {
        &self.emissions_g
    }

    fn count(&self) -> u64 {
        self.vehicles
    }

    fn damaged(&self) -> u64 {
        self.destroyed_structures
    }
}

/// Group `rows` by `keys` and sum every pollutant column.
///
/// Only combinations present in the input produce a group. An empty key list
/// collapses everything into one row; empty input gives an empty table.
pub fn aggregate<R: Aggregatable>(
    rows: &[R],
    keys: &[AggregateKey],
    pollutants: &[String],
) -> AggregateTable {
    let mut groups: BTreeMap<Vec<KeyValue>, AggregateRow> = BTreeMap::new();

    for row in rows {
        let group_key: Vec<KeyValue> = keys.iter().map(|k| row.key_value(*k)).collect();
        let entry = groups
            .entry(group_key)
            .or_insert_with_key(|k| AggregateRow {
                keys: k.clone(),
                count: 0,
                damaged: 0,
                totals_g: vec![0.0; pollutants.len()],
            });
        entry.count += row.count();
        entry.damaged += row.damaged();
        for (total, value) in entry.totals_g.iter_mut().zip(row.emissions()) {
            *total += value;
        }
    }

    info!(
        rows = rows.len(),
        groups = groups.len(),
        keys = ?keys.iter().map(|k| k.column()).collect::<Vec<_>>(),
        "Aggregated emissions"
    );

    AggregateTable {
        keys: keys.to_vec(),
        pollutants: pollutants.to_vec(),
        rows: groups.into_values().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DamageCategory;

    fn row(id: &str, county: &str, year: i32, fraction: f64, co: f64, pm: f64) -> EmissionRow {
        EmissionRow {
            structure_id: id.to_string(),
            incident_name: "AUGUST COMPLEX".to_string(),
            incident_number: "CA-MNF-000758".to_string(),
            year: Some(year),
            month: Some(8),
            county: county.to_string(),
            air_basin: "NORTH COAST".to_string(),
            air_district: "MENDOCINO".to_string(),
            district_id: "MEN".to_string(),
            coabdis: String::new(),
            aoi_index: None,
            damage: if fraction > 0.0 {
                DamageCategory::Destroyed
            } else {
                DamageCategory::None
            },
            category: None,
            location: None,
            floor_area: None,
            consumption_fraction: fraction,
            frame_factor: 1.0,
            contents_factor: 1.0,
            consumed_fuel_kg: 0.0,
            emissions_g: vec![co, pm],
        }
    }

    fn pollutants() -> Vec<String> {
        vec!["CO".to_string(), "PM".to_string()]
    }

    fn sample() -> Vec<EmissionRow> {
        vec![
            row("1", "TEHAMA", 2021, 0.95, 100.0, 10.0),
            row("2", "GLENN", 2020, 0.95, 50.0, 5.0),
            row("3", "TEHAMA", 2020, 0.0, 0.0, 0.0),
            row("4", "GLENN", 2021, 0.5, 25.0, 2.5),
            row("5", "TEHAMA", 2021, 0.5, 12.5, 1.25),
        ]
    }

    #[test]
    fn test_county_year_four_groups() {
        let table = aggregate(&sample(), &[AggregateKey::County, AggregateKey::Year], &pollutants());
        assert_eq!(table.rows.len(), 4);
        let keys: Vec<String> = table
            .rows
            .iter()
            .map(|r| format!("{}/{}", r.keys[0], r.keys[1]))
            .collect();
        assert_eq!(keys, ["GLENN/2020", "GLENN/2021", "TEHAMA/2020", "TEHAMA/2021"]);
        let tehama_2021 = &table.rows[3];
        assert_eq!(tehama_2021.count, 2);
        assert_eq!(tehama_2021.damaged, 2);
        assert_eq!(tehama_2021.totals_g, vec![112.5, 11.25]);
    }

    #[test]
    fn test_absent_combinations_have_no_group() {
        let rows: Vec<_> = sample().into_iter().filter(|r| r.county == "TEHAMA").collect();
        let table = aggregate(&rows, &[AggregateKey::County, AggregateKey::Year], &pollutants());
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn test_zero_emission_group_counted() {
        let table = aggregate(&sample(), &[AggregateKey::County, AggregateKey::Year], &pollutants());
        let tehama_2020 = &table.rows[2];
        assert_eq!(tehama_2020.count, 1);
        assert_eq!(tehama_2020.damaged, 0);
        assert_eq!(tehama_2020.totals_g, vec![0.0, 0.0]);
    }

    #[test]
    fn test_mass_conservation() {
        let rows = sample();
        for keys in [
            vec![],
            vec![AggregateKey::Year],
            vec![AggregateKey::County],
            vec![AggregateKey::Year, AggregateKey::County, AggregateKey::Incident],
        ] {
            let table = aggregate(&rows, &keys, &pollutants());
            for (i, p) in pollutants().iter().enumerate() {
                let detail: f64 = rows.iter().map(|r| r.emissions_g[i]).sum();
                assert!((table.total(p).unwrap() - detail).abs() < 1e-9);
            }
            let counted: u64 = table.rows.iter().map(|r| r.count).sum();
            assert_eq!(counted, rows.len() as u64);
        }
    }

    #[test]
    fn test_key_order_changes_order_not_groups() {
        let a = aggregate(&sample(), &[AggregateKey::County, AggregateKey::Year], &pollutants());
        let b = aggregate(&sample(), &[AggregateKey::Year, AggregateKey::County], &pollutants());
        assert_eq!(a.rows.len(), b.rows.len());
        assert_eq!(b.rows[0].keys, vec![KeyValue::Int(2020), KeyValue::from("GLENN")]);
        let mut a_sets: Vec<_> = a.rows.iter().map(|r| (r.keys[1].clone(), r.keys[0].clone(), r.count)).collect();
        let mut b_sets: Vec<_> = b.rows.iter().map(|r| (r.keys[0].clone(), r.keys[1].clone(), r.count)).collect();
        a_sets.sort();
        b_sets.sort();
        assert_eq!(a_sets, b_sets);
    }

    #[test]
    fn test_idempotent_and_order_independent() {
        let rows = sample();
        let mut reversed = rows.clone();
        reversed.reverse();
        let keys = [AggregateKey::County];
        let first = aggregate(&rows, &keys, &pollutants());
        assert_eq!(first, aggregate(&rows, &keys, &pollutants()));
        assert_eq!(first, aggregate(&reversed, &keys, &pollutants()));
    }

    #[test]
    fn test_empty_input_empty_table() {
        let table = aggregate::<EmissionRow>(&[], &[AggregateKey::Year], &pollutants());
        assert!(table.is_empty());
        assert_eq!(table.keys, vec![AggregateKey::Year]);
    }

    #[test]
    fn test_vehicle_rows_aggregate_by_unit() {
        let rows = vec![
            VehicleEmissionRow {
                unit: vec![(AggregateKey::Incident, KeyValue::from("CREEK"))],
                destroyed_structures: 5,
                vehicles: 7,
                emissions_g: vec![70.0, 7.0],
            },
            VehicleEmissionRow {
                unit: vec![(AggregateKey::Incident, KeyValue::from("CREEK"))],
                destroyed_structures: 1,
                vehicles: 1,
                emissions_g: vec![10.0, 1.0],
            },
        ];
        let table = aggregate(&rows, &[AggregateKey::Incident], &pollutants());
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].count, 8);
        assert_eq!(table.rows[0].damaged, 6);
        assert_eq!(table.rows[0].totals_g, vec![80.0, 8.0]);
    }
}

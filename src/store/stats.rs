//! Per-subdivision statistics joined onto the stored admin1 records.

use std::collections::BTreeMap;

use ahash::AHashMap;
use geo::{Intersects, Point, Rect};
use log::{debug, info};

use crate::geom::{envelope_of, Geometries};
use crate::store::GlobalMergeStore;
use crate::types::SubdivisionRecord;

/// Value column of the population table.
pub const POPULATION: &str = "Population";

/// Value column of the health facility table.
pub const HEALTH_FACILITIES: &str = "Health_Facilities";

/// Population by subdivision code, for one country.
pub type PopulationTable = AHashMap<String, f64>;

/// One row of a per-subdivision statistics table.
#[derive(Debug, Clone, PartialEq)]
pub struct StatRecord {
    pub country_code:     String,
    pub country_name:     String,
    pub subdivision_code: String,
    pub subdivision_name: String,
    /// `None` when the country has no data or the subdivision is missing from it.
    pub value:            Option<f64>,
}

impl GlobalMergeStore {
    /// Rows for every stored subdivision of `countries`, in store order.
    fn stat_rows(
        &self,
        countries: &[String],
        mut values: impl FnMut(&str, &[SubdivisionRecord]) -> Vec<Option<f64>>,
    ) -> Vec<StatRecord> {
        let mut rows = Vec::new();
        for iso3 in countries {
            let Some(records) = self.country(iso3) else {
                debug!("[store::stats] {iso3} has no stored subdivisions");
                continue;
            };
            let values = values(iso3, records);
            rows.extend(records.iter().zip(values).map(|(record, value)| StatRecord {
                country_code:     record.country_code.clone(),
                country_name:     record.country_name.clone(),
                subdivision_code: record.subdivision_code.clone(),
                subdivision_name: record.subdivision_name.clone(),
                value,
            }));
        }
        rows
    }

    /// Population per subdivision, joined on the subdivision code.
    pub fn derive_population(&self, countries: &[String], tables: &BTreeMap<String, PopulationTable>) -> Vec<StatRecord> {
        self.stat_rows(countries, |iso3, records| {
            let Some(table) = tables.get(iso3) else {
                info!("[store::stats] {iso3}: no population data");
                return vec![None; records.len()];
            };
            let values: Vec<Option<f64>> = records.iter().map(|r| table.get(&r.subdivision_code).copied()).collect();
            let unmatched = values.iter().filter(|v| v.is_none()).count();
            if unmatched > 0 {
                info!("[store::stats] {iso3}: {unmatched} subdivisions missing from the population table");
            }
            values
        })
    }

    /// Number of facility points in each subdivision. A point on a shared
    /// border counts for every subdivision it touches.
    pub fn derive_health_facilities(&self, countries: &[String], facilities: &BTreeMap<String, Vec<Point<f64>>>) -> Vec<StatRecord> {
        self.stat_rows(countries, |iso3, records| {
            let Some(points) = facilities.get(iso3) else {
                info!("[store::stats] {iso3}: no health facility data");
                return vec![None; records.len()];
            };
            let shapes = Geometries::new(records.iter().map(|r| r.geometry.clone()).collect());
            let mut counts = vec![0usize; records.len()];
            for point in points {
                let envelope = envelope_of(&Rect::new(point.0, point.0), 0.0);
                for idx in shapes.query(&envelope) {
                    if shapes.shapes()[idx].intersects(point) {
                        counts[idx] += 1;
                    }
                }
            }
            counts.into_iter().map(|n| Some(n as f64)).collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1), (x: x0, y: y0),
        ]])
    }

    fn record(iso3: &str, code: &str, shape: MultiPolygon<f64>) -> SubdivisionRecord {
        SubdivisionRecord {
            country_code:     iso3.into(),
            country_name:     format!("{iso3} land"),
            country_pcode2:   iso3[..2].into(),
            subdivision_code: code.into(),
            subdivision_name: code.into(),
            geometry:         shape,
        }
    }

    fn store() -> GlobalMergeStore {
        GlobalMergeStore::from_records([
            record("ABC", "AB01", rect(0.0, 0.0, 1.0, 1.0)),
            record("ABC", "AB02", rect(1.0, 0.0, 2.0, 1.0)),
            record("DEF", "DE01", rect(5.0, 5.0, 6.0, 6.0)),
        ])
    }

    #[test]
    fn population_joins_on_code_and_leaves_gaps_empty() {
        let tables = BTreeMap::from([
            ("ABC".to_string(), PopulationTable::from_iter([("AB01".to_string(), 1200.0), ("ZZ99".to_string(), 5.0)])),
        ]);
        let countries = vec!["ABC".to_string(), "DEF".to_string(), "GHI".to_string()];
        let rows = store().derive_population(&countries, &tables);

        let values: Vec<(&str, Option<f64>)> = rows.iter().map(|r| (r.subdivision_code.as_str(), r.value)).collect();
        assert_eq!(values, [("AB01", Some(1200.0)), ("AB02", None), ("DE01", None)]);
    }

    #[test]
    fn facilities_are_counted_per_subdivision() {
        let facilities = BTreeMap::from([(
            "ABC".to_string(),
            vec![Point::new(0.5, 0.5), Point::new(0.2, 0.7), Point::new(1.5, 0.5), Point::new(1.0, 0.5), Point::new(9.0, 9.0)],
        )]);
        let countries = vec!["ABC".to_string(), "DEF".to_string()];
        let rows = store().derive_health_facilities(&countries, &facilities);

        let values: Vec<Option<f64>> = rows.iter().map(|r| r.value).collect();
        // The point on the AB01/AB02 border counts for both.
        assert_eq!(values, [Some(3.0), Some(2.0), None]);
        assert_eq!(rows[2].country_name, "DEF land");
    }
}

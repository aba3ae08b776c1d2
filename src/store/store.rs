use std::collections::{BTreeMap, BTreeSet};

use ahash::AHashSet;
use log::{debug, info};

use crate::error::BoundaryError;
use crate::types::SubdivisionRecord;

/// The worldwide admin1 dataset, keyed by ISO3 country code.
///
/// Countries are replaced wholesale: a country's records are either all from
/// the previous publication or all from the current run, never a mix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalMergeStore {
    countries: BTreeMap<String, Vec<SubdivisionRecord>>,
}

impl GlobalMergeStore {
    pub fn new() -> Self { Self::default() }

    /// Group previously published records by country, keeping their order.
    pub fn from_records(records: impl IntoIterator<Item = SubdivisionRecord>) -> Self {
        let mut countries: BTreeMap<String, Vec<SubdivisionRecord>> = BTreeMap::new();
        for record in records {
            countries.entry(record.country_code.clone()).or_default().push(record);
        }
        Self { countries }
    }

    /// Number of countries held.
    #[inline] pub fn num_countries(&self) -> usize { self.countries.len() }

    /// Number of subdivision records held.
    pub fn len(&self) -> usize { self.countries.values().map(Vec::len).sum() }

    #[inline] pub fn is_empty(&self) -> bool { self.countries.is_empty() }

    #[inline] pub fn contains(&self, code: &str) -> bool { self.countries.contains_key(code) }

    pub fn country(&self, code: &str) -> Option<&[SubdivisionRecord]> {
        self.countries.get(code).map(Vec::as_slice)
    }

    pub fn country_codes(&self) -> impl Iterator<Item = &str> {
        self.countries.keys().map(String::as_str)
    }

    /// All records, by country code then insertion order.
    pub fn records(&self) -> impl Iterator<Item = &SubdivisionRecord> {
        self.countries.values().flatten()
    }

    /// Replace every record of `code` with `records`, returning how many were replaced.
    /// Nothing changes unless all records are valid.
    pub fn upsert_country(&mut self, code: &str, records: Vec<SubdivisionRecord>) -> Result<usize, BoundaryError> {
        let invalid = |reason: String| BoundaryError::InvalidRecords { iso3: code.to_string(), reason };

        if records.is_empty() {
            return Err(invalid("no subdivisions to store".to_string()));
        }
        let mut seen: AHashSet<&str> = AHashSet::with_capacity(records.len());
        for record in &records {
            if record.country_code != code {
                return Err(invalid(format!("record {} belongs to {}", record.subdivision_code, record.country_code)));
            }
            if record.geometry.0.is_empty() {
                return Err(invalid(format!("record {} has empty geometry", record.subdivision_code)));
            }
            if !seen.insert(record.subdivision_code.as_str()) {
                return Err(invalid(format!("duplicate subdivision code {}", record.subdivision_code)));
            }
        }

        let count = records.len();
        let replaced = self.countries.insert(code.to_string(), records).map_or(0, |old| old.len());
        debug!("[store] {code}: stored {count} subdivisions, replaced {replaced}");
        Ok(replaced)
    }

    /// Drop a country, returning its records.
    pub fn remove_country(&mut self, code: &str) -> Option<Vec<SubdivisionRecord>> {
        self.countries.remove(code)
    }

    /// Keep only the listed countries, returning the codes removed.
    pub fn retain_countries(&mut self, keep: &BTreeSet<String>) -> Vec<String> {
        let removed: Vec<String> = self.countries.keys()
            .filter(|code| !keep.contains(*code))
            .cloned()
            .collect();
        for code in &removed {
            self.countries.remove(code);
        }
        if !removed.is_empty() {
            info!("[store] removed countries no longer configured: {}", removed.join(", "));
        }
        removed
    }
}

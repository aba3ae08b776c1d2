//! CSV reading operations.

use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use log::{debug, info};
use polars::{frame::DataFrame, io::SerReader, prelude::{CsvReadOptions, CsvReader}};
use regex::Regex;

use crate::store::{PopulationTable, RegionAssignment};

/// Every column is read as text so codes keep their leading zeros.
fn text_options() -> CsvReadOptions {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
}

/// Reads a CSV file from `path` into a Polars DataFrame of string columns.
pub(crate) fn read_csv(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)
        .with_context(|| format!("[io::csv::read] Failed to open CSV file: {}", path.display()))?;
    CsvReader::new(file)
        .with_options(text_options())
        .finish()
        .with_context(|| format!("[io::csv::read] Failed to read CSV from {:?}", path))
}

/// Reads a CSV from a string into a DataFrame of string columns.
#[cfg(test)]
pub(crate) fn read_csv_string(csv: &str) -> Result<DataFrame> {
    CsvReader::new(std::io::Cursor::new(csv.as_bytes()))
        .with_options(text_options())
        .finish()
        .context("[io::csv::read] Failed to read CSV from string")
}

/// Build the ISO3 → region table from two columns of a DataFrame.
/// Rows with a blank code or region are skipped.
pub(crate) fn region_assignment_from_df(df: &DataFrame, iso3_col: &str, region_col: &str) -> Result<RegionAssignment> {
    let iso3 = df.column(iso3_col)
        .with_context(|| format!("[io::csv::read] Missing region column {iso3_col:?}"))?
        .str()?;
    let region = df.column(region_col)
        .with_context(|| format!("[io::csv::read] Missing region column {region_col:?}"))?
        .str()?;

    let mut skipped = 0;
    let assignment = iso3.into_iter().zip(region.into_iter())
        .filter_map(|(code, name)| {
            let code = code.map(str::trim).filter(|s| !s.is_empty());
            let name = name.map(str::trim).filter(|s| !s.is_empty());
            match (code, name) {
                (Some(code), Some(name)) => Some((code.to_string(), name.to_string())),
                _ => { skipped += 1; None }
            }
        })
        .collect();
    if skipped > 0 {
        debug!("[io::csv::read] skipped {skipped} region rows with blank values");
    }
    Ok(assignment)
}

/// Reads the regional office table.
pub fn read_region_assignment(path: &Path, iso3_col: &str, region_col: &str) -> Result<RegionAssignment> {
    let df = read_csv(path)?;
    region_assignment_from_df(&df, iso3_col, region_col)
        .with_context(|| format!("[io::csv::read] Invalid region table {}", path.display()))
}

/// Columns of a subnational population table used for the admin1 join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulationColumns {
    pub pcode:      String,
    pub population: String,
}

impl PopulationColumns {
    /// Pick the admin1 code column and the total population column from a header row.
    ///
    /// The code column is the first one mentioning a code and the digit 1. A
    /// population column is any total-looking header that is not split by sex
    /// or age and names at most one year; among several, a later year wins.
    pub fn detect<S: AsRef<str>>(headers: &[S]) -> Result<Self> {
        let code     = Regex::new(r"(?i)code")?;
        let total    = Regex::new(r"(?i)(population|both|total|proj|pop|t|ensemble)")?;
        let sex      = Regex::new(r"(?i)_f|_m|m_|f_|year|female|male")?;
        let age      = Regex::new(r"^\d{1,2}\D|(\D\d{1,2}\D)|(\D\d$)")?;
        let age_word = Regex::new(r"(?i)(age|adult)")?;
        let year     = Regex::new(r"\d{4}")?;
        let year_20  = Regex::new(r"20\d{2}")?;

        let mut pcode: Option<&str> = None;
        let mut population: Option<&str> = None;
        for header in headers.iter().map(|h| h.as_ref()) {
            if pcode.is_none() && code.is_match(header) && header.contains('1') {
                pcode = Some(header);
            }
            let years = year.find_iter(header).count();
            if !total.is_match(header) || sex.is_match(header) || age.is_match(header)
                || age_word.is_match(header) || years >= 2 {
                continue;
            }
            match population {
                None => population = Some(header),
                Some(current) if years > 0 => {
                    let year_of = |h: &str| year_20.find(h).and_then(|m| m.as_str().parse::<u32>().ok());
                    match (year_of(current), year_of(header)) {
                        (Some(old), Some(new)) if new > old => population = Some(header),
                        (None, _) => info!("[io::csv::read] not sure which population column to pick: {current}, {header}"),
                        _ => {}
                    }
                }
                Some(_) => {}
            }
        }

        let pcode = pcode.context("[io::csv::read] Could not find an admin1 code column")?;
        let population = population.context("[io::csv::read] Could not find a population column")?;
        Ok(Self { pcode: pcode.to_string(), population: population.to_string() })
    }
}

/// Parse a population figure, allowing thousands separators.
fn parse_population(value: &str) -> Option<f64> {
    value.trim().replace(',', "").parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Build the code → population table from a DataFrame of string columns.
pub(crate) fn population_table_from_df(df: &DataFrame) -> Result<PopulationTable> {
    let headers: Vec<String> = df.get_column_names().iter().map(|name| name.to_string()).collect();
    let columns = PopulationColumns::detect(&headers)?;
    debug!("[io::csv::read] population columns: {} / {}", columns.pcode, columns.population);

    let codes = df.column(&columns.pcode)?.str()?;
    let values = df.column(&columns.population)?.str()?;
    let mut skipped = 0;
    let table = codes.into_iter().zip(values.into_iter())
        .filter_map(|(code, value)| {
            let code = code.map(str::trim).filter(|s| !s.is_empty());
            match (code, value.and_then(parse_population)) {
                (Some(code), Some(value)) => Some((code.to_string(), value)),
                _ => { skipped += 1; None }
            }
        })
        .collect();
    if skipped > 0 {
        debug!("[io::csv::read] skipped {skipped} population rows without a code or figure");
    }
    Ok(table)
}

/// Reads an admin1 population table.
pub fn read_population_table(path: &Path) -> Result<PopulationTable> {
    let df = read_csv(path)?;
    population_table_from_df(&df)
        .with_context(|| format!("[io::csv::read] Invalid population table {}", path.display()))
}

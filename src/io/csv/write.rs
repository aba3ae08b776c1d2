//! CSV writing operations.

use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerWriter, prelude::{CsvWriter, NamedFrom}, series::Series};

use crate::io::geojson::{ADM0_REF, ADM1_PCODE, ADM1_REF, ALPHA_3};
use crate::store::StatRecord;

/// Write a DataFrame to a CSV file.
pub(crate) fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("[io::csv::write] Failed to create CSV file: {}", path.display()))?;
    CsvWriter::new(file)
        .finish(df)
        .with_context(|| format!("[io::csv::write] Failed to write CSV to {:?}", path))
}

/// Write a per-subdivision statistics table with the admin1 key columns and
/// one value column named `column`. Missing values are left empty.
pub fn write_stat_table(path: &Path, column: &str, records: &[StatRecord]) -> Result<()> {
    let text = |f: fn(&StatRecord) -> String| records.iter().map(f).collect::<Vec<String>>();
    let values: Vec<Option<String>> = records.iter().map(|r| r.value.map(|v| v.to_string())).collect();

    let mut df = DataFrame::new(vec![
        Series::new(ALPHA_3.into(), text(|r| r.country_code.clone())).into(),
        Series::new(ADM0_REF.into(), text(|r| r.country_name.clone())).into(),
        Series::new(ADM1_PCODE.into(), text(|r| r.subdivision_code.clone())).into(),
        Series::new(ADM1_REF.into(), text(|r| r.subdivision_name.clone())).into(),
        Series::new(column.into(), values).into(),
    ])?;

    write_csv(&mut df, path)
}

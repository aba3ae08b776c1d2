//! Admin1 attribute lookup files.

use std::{fs::File, io::{BufWriter, Write}, path::Path};

use anyhow::{Context, Result};

use crate::store::LookupRecord;

/// Write one lookup line per record.
pub fn write_lookup(path: &Path, records: &[LookupRecord]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("[io::lookup] Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for record in records {
        writeln!(writer, "{record}")
            .with_context(|| format!("[io::lookup] Failed to write {}", path.display()))?;
    }
    writer.flush().with_context(|| format!("[io::lookup] Failed to flush {}", path.display()))
}

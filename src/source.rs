use std::{collections::{BTreeMap, HashMap}, path::{Path, PathBuf}};

use anyhow::Result;
use log::{debug, info};
use regex::Regex;

use crate::common::{ensure_dir_exists, extract_zip, find_files_with_extension};
use crate::error::BoundaryError;
use crate::io::shp::read_source_layer;
use crate::types::SourceLayer;

/// File names that look like an admin1 layer, used to pick among several shapefiles.
const ADM1_FILE_PATTERN: &str = r"(?i).*adm.*1.*";

/// File names of the point layer in a facility dataset.
const POINT_FILE_PATTERN: &str = r"(?i).*point.*";

/// Access to per-country boundary layers by ISO3 code.
pub trait BoundarySource: Send + Sync {
    fn fetch(&self, iso3: &str) -> Result<SourceLayer, BoundaryError>;
}

/// Per-country datasets under one root, one directory (or `.zip`) per country.
///
/// A country's dataset is named `{prefix}{iso3 lowercase}{suffix}` unless an
/// exception names another one. A `{name}.zip` beside a missing `{name}/` is
/// extracted on first use. When a dataset holds several files of the wanted
/// extension, only those whose name matches the file pattern are considered.
pub struct DatasetDir {
    root:       PathBuf,
    exceptions: BTreeMap<String, String>,
    prefix:     String,
    suffix:     String,
    extension:  String,
    file:       Regex,
}

impl DatasetDir {
    pub fn new(root: impl Into<PathBuf>, exceptions: BTreeMap<String, String>, extension: &str, file_pattern: &str) -> Result<Self> {
        Ok(Self {
            root:      root.into(),
            exceptions,
            prefix:    String::new(),
            suffix:    String::new(),
            extension: extension.to_string(),
            file:      Regex::new(file_pattern)?,
        })
    }

    /// Admin1 population tables in `cod-ps-{iso3}` datasets.
    pub fn population(root: impl Into<PathBuf>, exceptions: BTreeMap<String, String>) -> Result<Self> {
        Ok(Self::new(root, exceptions, "csv", ADM1_FILE_PATTERN)?.with_naming("cod-ps-", ""))
    }

    /// Facility point shapefiles in `hotosm_{iso3}_health_facilities` datasets.
    pub fn health_facilities(root: impl Into<PathBuf>, exceptions: BTreeMap<String, String>) -> Result<Self> {
        Ok(Self::new(root, exceptions, "shp", POINT_FILE_PATTERN)?.with_naming("hotosm_", "_health_facilities"))
    }

    /// Name datasets `{prefix}{iso3}{suffix}`, e.g. `cod-ps-afg`.
    pub fn with_naming(mut self, prefix: &str, suffix: &str) -> Self {
        self.prefix = prefix.to_string();
        self.suffix = suffix.to_string();
        self
    }

    fn dataset_dir(&self, iso3: &str) -> PathBuf {
        let name = self.exceptions.get(iso3).cloned()
            .unwrap_or_else(|| format!("{}{}{}", self.prefix, iso3.to_ascii_lowercase(), self.suffix));
        self.root.join(name)
    }

    fn unavailable(iso3: &str, reason: String) -> BoundaryError {
        BoundaryError::Download { iso3: iso3.to_string(), reason }
    }

    /// Make sure the dataset directory exists, extracting its archive if needed.
    fn prepare(&self, iso3: &str, dir: &Path) -> Result<(), BoundaryError> {
        if dir.is_dir() { return Ok(()) }
        let mut archive = dir.as_os_str().to_owned();
        archive.push(".zip");
        let archive = PathBuf::from(archive);
        if !archive.is_file() {
            return Err(Self::unavailable(iso3, format!("no dataset at {} or {}", dir.display(), archive.display())));
        }
        info!("[source] {iso3}: extracting {}", archive.display());
        ensure_dir_exists(dir)?;
        extract_zip(&archive, dir)?;
        Ok(())
    }

    /// The single matching file of a country's dataset.
    pub fn locate(&self, iso3: &str) -> Result<PathBuf, BoundaryError> {
        let dir = self.dataset_dir(iso3);
        self.prepare(iso3, &dir)?;

        let mut candidates = find_files_with_extension(&dir, &self.extension);
        if candidates.len() > 1 {
            candidates.retain(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| self.file.is_match(name))
            });
        }
        match candidates.len() {
            1 => Ok(candidates.remove(0)),
            0 => Err(Self::unavailable(iso3, format!("no matching .{} file in {}", self.extension, dir.display()))),
            n => Err(Self::unavailable(iso3, format!("could not distinguish between {n} .{} files in {}", self.extension, dir.display()))),
        }
    }
}

/// Boundary shapefiles unpacked on disk, one dataset per country named by its
/// lowercase ISO3 code.
pub struct DiskSource {
    datasets: DatasetDir,
}

impl DiskSource {
    pub fn new(root: impl Into<PathBuf>, exceptions: BTreeMap<String, String>) -> Result<Self> {
        Ok(Self { datasets: DatasetDir::new(root, exceptions, "shp", ADM1_FILE_PATTERN)? })
    }

    /// The single admin1 shapefile of a country's dataset.
    pub fn locate_shapefile(&self, iso3: &str) -> Result<PathBuf, BoundaryError> {
        self.datasets.locate(iso3)
    }
}

impl BoundarySource for DiskSource {
    fn fetch(&self, iso3: &str) -> Result<SourceLayer, BoundaryError> {
        let path = self.locate_shapefile(iso3)?;
        debug!("[source] {iso3}: reading {}", path.display());
        read_source_layer(&path).map_err(|e| DatasetDir::unavailable(iso3, format!("{e:#}")))
    }
}

/// In-memory layers keyed by ISO3.
#[derive(Default, Clone)]
pub struct MemSource {
    pub(crate) layers: HashMap<String, SourceLayer>,
}

impl MemSource {
    pub fn new(layers: HashMap<String, SourceLayer>) -> Self { Self { layers } }

    pub fn insert(&mut self, iso3: &str, layer: SourceLayer) {
        self.layers.insert(iso3.to_string(), layer);
    }
}

impl BoundarySource for MemSource {
    fn fetch(&self, iso3: &str) -> Result<SourceLayer, BoundaryError> {
        self.layers.get(iso3).cloned()
            .ok_or_else(|| BoundaryError::Download { iso3: iso3.to_string(), reason: "no layer in memory".to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn picks_the_admin1_shapefile_among_several() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("afg");
        fs::create_dir_all(&dir).unwrap();
        for name in ["afg_admbnda_adm0.shp", "afg_admbnda_adm1.shp", "afg_admbnda_adm2.shp"] {
            fs::write(dir.join(name), b"").unwrap();
        }
        let source = DiskSource::new(root.path(), BTreeMap::new()).unwrap();
        let found = source.locate_shapefile("AFG").unwrap();
        assert_eq!(found.file_name().unwrap(), "afg_admbnda_adm1.shp");
    }

    #[test]
    fn ambiguous_or_missing_datasets_fail() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("sdn_custom");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("sdn_adm1_a.shp"), b"").unwrap();
        fs::write(dir.join("sdn_adm1_b.shp"), b"").unwrap();

        let exceptions = BTreeMap::from([("SDN".to_string(), "sdn_custom".to_string())]);
        let source = DiskSource::new(root.path(), exceptions).unwrap();
        assert!(matches!(source.locate_shapefile("SDN"), Err(BoundaryError::Download { .. })));
        assert!(matches!(source.fetch("TCD"), Err(BoundaryError::Download { .. })));
    }

    #[test]
    fn named_datasets_pick_files_by_pattern() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("cod-ps-afg");
        fs::create_dir_all(&dir).unwrap();
        for name in ["afg_pop_adm0.csv", "afg_pop_adm1.csv", "afg_pop_adm2.csv"] {
            fs::write(dir.join(name), b"").unwrap();
        }
        let datasets = DatasetDir::population(root.path(), BTreeMap::new()).unwrap();
        assert_eq!(datasets.locate("AFG").unwrap().file_name().unwrap(), "afg_pop_adm1.csv");
        assert!(matches!(datasets.locate("SDN"), Err(BoundaryError::Download { .. })));

        let dir = root.path().join("hotosm_sdn_health_facilities");
        fs::create_dir_all(&dir).unwrap();
        for name in ["hotosm_sdn_health_facilities_points.shp", "hotosm_sdn_health_facilities_polygons.shp"] {
            fs::write(dir.join(name), b"").unwrap();
        }
        let datasets = DatasetDir::health_facilities(root.path(), BTreeMap::new()).unwrap();
        assert_eq!(datasets.locate("SDN").unwrap().file_name().unwrap(), "hotosm_sdn_health_facilities_points.shp");
    }

    #[test]
    fn memory_source_returns_clones() {
        let mut source = MemSource::default();
        source.insert("ZZZ", SourceLayer::default());
        assert!(source.fetch("ZZZ").unwrap().is_empty());
        assert!(source.fetch("YYY").is_err());
    }
}

//! YAML run configuration.

use std::{collections::{BTreeMap, BTreeSet}, fs, path::Path};

use anyhow::{Context, Result};
use arcgraph::SimplifyOptions;
use serde::Deserialize;

use crate::pcode::NumericPcodeRule;
use crate::schema::FieldRules;
use crate::types::CountryInfo;

#[derive(Debug, Clone, Deserialize)]
pub struct Configuration {
    /// Visualization → admin0 countries (ISO3) covered by its regional boxes.
    #[serde(default)]
    pub adm0: BTreeMap<String, Vec<String>>,
    /// Visualization → countries (ISO3) with admin1 boundaries.
    #[serde(default)]
    pub adm1: BTreeMap<String, Vec<String>>,
    /// Countries with a Humanitarian Response Plan.
    #[serde(rename = "HRPs", default)]
    pub hrps: Vec<String>,
    #[serde(default)]
    pub boundaries: DatasetConfig,
    /// Subnational population tables (`cod-ps-{iso3}` datasets).
    #[serde(default)]
    pub population: DatasetConfig,
    /// Health facility point layers (`hotosm_{iso3}_health_facilities` datasets).
    #[serde(default)]
    pub health_facilities: DatasetConfig,
    #[serde(default)]
    pub shapefile_attribute_mappings: AttributeMappings,
    #[serde(default)]
    pub regional: RegionalConfig,
    /// Property holding the region name in regional bounding box files.
    #[serde(default = "default_region_key")]
    pub region_key: String,
    #[serde(default)]
    pub countries: BTreeMap<String, CountryEntry>,
    #[serde(default)]
    pub outline: OutlineConfig,
    #[serde(default)]
    pub simplify: SimplifyConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub pcodes: PcodeConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatasetConfig {
    /// ISO3 → dataset directory name, where it differs from the default naming.
    #[serde(default)]
    pub exceptions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttributeMappings {
    #[serde(default)]
    pub pcode: Vec<String>,
    #[serde(default)]
    pub name: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegionalConfig {
    /// Region CSV column holding the ISO3 code.
    #[serde(default = "default_regional_iso3")]
    pub iso3: String,
    /// Region CSV column holding the region name.
    #[serde(default = "default_regional_region")]
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountryEntry {
    pub name: String,
    pub iso2: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutlineConfig {
    #[serde(default = "default_iso3_field")]
    pub iso3_field: String,
    #[serde(default = "default_color_field")]
    pub color_field: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SimplifyConfig {
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_true")]
    pub prevent_oversimplify: bool,
    #[serde(default = "default_min_area")]
    pub min_area: f64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ReconcileConfig {
    /// Fixed shared-edge tolerance in degrees; derived from each outline's extent when unset.
    #[serde(default)]
    pub edge_tolerance: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PcodeConfig {
    #[serde(default)]
    pub numeric_rule: NumericPcodeRule,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PipelineConfig {
    /// Worker threads for per-country processing; sequential when unset or 1.
    #[serde(default)]
    pub workers: Option<usize>,
}

fn default_region_key()      -> String { "tbl_regcov_2020_ocha_Field3".to_string() }
fn default_regional_iso3()   -> String { "ISO3".to_string() }
fn default_regional_region() -> String { "Regional_office".to_string() }
fn default_iso3_field()      -> String { "ISO_3".to_string() }
fn default_color_field()     -> String { "Color_Code".to_string() }
fn default_tolerance()       -> f64 { 0.01 }
fn default_min_area()        -> f64 { 0.25 }
fn default_true()            -> bool { true }

impl Default for RegionalConfig {
    fn default() -> Self {
        Self { iso3: default_regional_iso3(), region: default_regional_region() }
    }
}

impl Default for OutlineConfig {
    fn default() -> Self {
        Self { iso3_field: default_iso3_field(), color_field: default_color_field() }
    }
}

impl Default for SimplifyConfig {
    fn default() -> Self {
        Self { tolerance: default_tolerance(), prevent_oversimplify: true, min_area: default_min_area() }
    }
}

impl Configuration {
    /// Read and validate a configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("[config] Failed to read configuration {}", path.display()))?;
        Self::from_yaml_str(&text)
            .with_context(|| format!("[config] Invalid configuration {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text).context("[config] Failed to parse YAML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.simplify.tolerance.is_finite() && self.simplify.tolerance >= 0.0,
            "[config] simplify.tolerance must be a non-negative number, got {}", self.simplify.tolerance);
        anyhow::ensure!((0.0..1.0).contains(&self.simplify.min_area),
            "[config] simplify.min_area must be in [0, 1), got {}", self.simplify.min_area);
        if let Some(tolerance) = self.reconcile.edge_tolerance {
            anyhow::ensure!(tolerance.is_finite() && tolerance > 0.0,
                "[config] reconcile.edge_tolerance must be a positive number, got {tolerance}");
        }
        anyhow::ensure!(self.pipeline.workers != Some(0), "[config] pipeline.workers must be at least 1");
        for (iso3, entry) in &self.countries {
            anyhow::ensure!(entry.iso2.len() == 2,
                "[config] countries.{iso3}.iso2 must be two letters, got {:?}", entry.iso2);
        }
        Ok(())
    }

    /// Country metadata for an ISO3 code.
    pub fn country(&self, iso3: &str) -> Option<CountryInfo> {
        self.countries.get(iso3).map(|entry| CountryInfo {
            iso3: iso3.to_string(),
            iso2: entry.iso2.clone(),
            name: entry.name.clone(),
        })
    }

    /// Every visualization named in the configuration.
    pub fn visualizations(&self) -> Vec<String> {
        self.adm0.keys().chain(self.adm1.keys())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Union of the admin1 country lists of all visualizations.
    pub fn all_adm1_countries(&self) -> BTreeSet<String> {
        self.adm1.values().flatten().cloned().collect()
    }

    /// Field matchers with this configuration's alias tables.
    pub fn field_rules(&self) -> Result<FieldRules> {
        FieldRules::new(&self.shapefile_attribute_mappings.pcode, &self.shapefile_attribute_mappings.name)
    }

    pub fn simplify_options(&self) -> SimplifyOptions {
        SimplifyOptions {
            tolerance:            self.simplify.tolerance,
            prevent_oversimplify: self.simplify.prevent_oversimplify,
            min_area:             self.simplify.min_area,
        }
    }
}

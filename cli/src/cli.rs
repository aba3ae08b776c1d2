use std::path::PathBuf;

use adminbounds::CountrySelection;

/// Admin1 boundary harmonization CLI
#[derive(clap::Parser, Debug)]
#[command(name = "adminbounds", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Harmonize country boundaries and write the global layers
    Run(RunArgs),
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Process country sources and rewrite the admin1 and centroid layers
    Boundaries,
    /// Write per-visualization attribute lookup files
    Lookup,
    /// Write per-visualization regional bounding boxes
    Regions,
    /// Join admin1 population figures onto the stored subdivisions
    Population,
    /// Count health facility points per stored subdivision
    HealthFacilities,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// YAML configuration file
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Output directory, defaults to "."
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub output: Option<PathBuf>,

    /// Previously published admin1 layer to update
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub latest: Option<PathBuf>,

    /// Directory of per-country boundary datasets
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    pub sources: Option<PathBuf>,

    /// Canonical admin0 outline GeoJSON
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub outlines: Option<PathBuf>,

    /// Water polygons removed from outlines
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub water: Option<PathBuf>,

    /// Country to regional office CSV
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub regions: Option<PathBuf>,

    /// Existing regional bounding box file whose features are refreshed
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub region_template: Option<PathBuf>,

    /// Directory of per-country population datasets
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    pub population: Option<PathBuf>,

    /// Directory of per-country health facility datasets
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    pub health_facilities: Option<PathBuf>,

    /// Stages to run
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = [Stage::Boundaries, Stage::Lookup, Stage::Regions])]
    pub stages: Vec<Stage>,

    /// "all" or comma-separated ISO3 codes
    #[arg(long, default_value = "all")]
    pub countries: CountrySelection,

    /// Visualizations to produce, defaults to every configured one
    #[arg(long, value_delimiter = ',')]
    pub visualizations: Vec<String>,
}

use std::{collections::BTreeMap, path::{Path, PathBuf}};

use anyhow::{Context, Result};
use log::{error, info, warn};

use adminbounds::{
    apply_region_template, read_country_outlines, read_points, read_population_table,
    read_region_assignment, read_region_template, read_subdivisions, read_water_mask,
    region_features, select_countries, write_centroids, write_lookup, write_regions,
    write_stat_table, write_subdivisions, Configuration, CountryOutlines, DatasetDir, DiskSource,
    GlobalMergeStore, Pipeline, WaterMask, HEALTH_FACILITIES, POPULATION,
};

use crate::cli::{Cli, RunArgs, Stage};

const ADM1_LAYER:     &str = "wrl_polbnda_adm1.geojson";
const CENTROID_LAYER: &str = "wrl_centroid_adm1.geojson";
const POPULATION_TABLE: &str = "population_by_adm1.csv";
const FACILITY_TABLE:   &str = "health_facilities_by_adm1.csv";

fn required<'a>(path: &'a Option<PathBuf>, flag: &str, stage: &str) -> Result<&'a Path> {
    path.as_deref().with_context(|| format!("[run] --{flag} is required for the {stage} stage"))
}

fn load_outlines(config: &Configuration, path: &Path) -> Result<CountryOutlines> {
    info!("[run] loading country outlines from {}", path.display());
    read_country_outlines(path, &config.outline.iso3_field, &config.outline.color_field)
}

/// Read each country's dataset; countries without one are left out.
fn read_per_country<T>(datasets: &DatasetDir, countries: &[String], read: impl Fn(&Path) -> Result<T>) -> BTreeMap<String, T> {
    let mut loaded = BTreeMap::new();
    for iso3 in countries {
        let path = match datasets.locate(iso3) {
            Ok(path) => path,
            Err(e) => { info!("[run] {e}"); continue }
        };
        match read(&path) {
            Ok(value) => { loaded.insert(iso3.clone(), value); }
            Err(e) => error!("[run] {iso3}: {e:#}"),
        }
    }
    loaded
}

pub fn run(_cli: &Cli, args: &RunArgs) -> Result<()> {
    let config = Configuration::from_path(&args.config)?;
    let out_dir = args.output.clone().unwrap_or_else(|| ".".into());
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("[run] Failed to create output directory {}", out_dir.display()))?;

    let visualizations = if args.visualizations.is_empty() { config.visualizations() } else { args.visualizations.clone() };

    let mut store = match &args.latest {
        Some(path) => {
            info!("[run] loading published admin1 layer from {}", path.display());
            GlobalMergeStore::from_records(read_subdivisions(path)?)
        }
        None => GlobalMergeStore::new(),
    };
    info!("[run] store holds {} subdivisions in {} countries", store.len(), store.num_countries());

    let mut outlines: Option<CountryOutlines> = None;

    if args.stages.contains(&Stage::Boundaries) {
        let loaded = load_outlines(&config, required(&args.outlines, "outlines", "boundaries")?)?;
        let water = match &args.water {
            Some(path) => read_water_mask(path)?,
            None => WaterMask::none(),
        };
        let source = DiskSource::new(required(&args.sources, "sources", "boundaries")?, config.boundaries.exceptions.clone())?;
        let countries = select_countries(&config, &visualizations, &args.countries);

        let summary = Pipeline::new(&config, &loaded, &water)?.run(&countries, &source, &mut store);
        info!("[run] boundaries: {summary}");

        store.retain_countries(&config.all_adm1_countries());

        info!("[run] writing {} subdivisions to {}", store.len(), out_dir.join(ADM1_LAYER).display());
        write_subdivisions(&out_dir.join(ADM1_LAYER), store.records())?;
        write_centroids(&out_dir.join(CENTROID_LAYER), &store.derive_centroids())?;
        outlines = Some(loaded);
    }

    if args.stages.contains(&Stage::Lookup) {
        for viz in &visualizations {
            let Some(countries) = config.adm1.get(viz) else { continue };
            let lookup = store.derive_attribute_lookup(Some(countries.as_slice()));
            let path = out_dir.join(format!("{viz}_adm1_attributes.txt"));
            info!("[run] writing {} lookup entries to {}", lookup.len(), path.display());
            write_lookup(&path, &lookup)?;
        }
    }

    if args.stages.contains(&Stage::Regions) {
        let assignment = read_region_assignment(
            required(&args.regions, "regions", "regions")?,
            &config.regional.iso3,
            &config.regional.region,
        )?;
        let outlines = match outlines {
            Some(loaded) => loaded,
            None => match &args.outlines {
                Some(path) => load_outlines(&config, path)?,
                None => CountryOutlines::new(Vec::new()),
            },
        };
        let template = args.region_template.as_deref().map(read_region_template).transpose()?;

        for viz in &visualizations {
            let Some(countries) = config.adm0.get(viz) else { continue };
            let computed = store.derive_regional_bbox(&outlines, countries, &assignment, &config.hrps);
            let features = match &template {
                Some(template) => {
                    let (features, gaps) = apply_region_template(template.clone(), &config.region_key, &computed);
                    if !gaps.is_empty() {
                        warn!("[run] {viz}: {} template regions without a bounding box", gaps.len());
                    }
                    features
                }
                None => region_features(&config.region_key, &computed),
            };
            let path = out_dir.join(format!("{viz}_regions_bbox.geojson"));
            info!("[run] writing {} regions to {}", features.len(), path.display());
            write_regions(&path, &features)?;
        }
    }

    if args.stages.contains(&Stage::Population) {
        let root = required(&args.population, "population", "population")?;
        let datasets = DatasetDir::population(root, config.population.exceptions.clone())?;
        let countries = select_countries(&config, &visualizations, &args.countries);
        let tables = read_per_country(&datasets, &countries, read_population_table);
        let rows = store.derive_population(&countries, &tables);
        let path = out_dir.join(POPULATION_TABLE);
        info!("[run] writing population for {} subdivisions to {}", rows.len(), path.display());
        write_stat_table(&path, POPULATION, &rows)?;
    }

    if args.stages.contains(&Stage::HealthFacilities) {
        let root = required(&args.health_facilities, "health-facilities", "health-facilities")?;
        let datasets = DatasetDir::health_facilities(root, config.health_facilities.exceptions.clone())?;
        let countries = select_countries(&config, &visualizations, &args.countries);
        let facilities = read_per_country(&datasets, &countries, read_points);
        let rows = store.derive_health_facilities(&countries, &facilities);
        let path = out_dir.join(FACILITY_TABLE);
        info!("[run] writing facility counts for {} subdivisions to {}", rows.len(), path.display());
        write_stat_table(&path, HEALTH_FACILITIES, &rows)?;
    }

    Ok(())
}

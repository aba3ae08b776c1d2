use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::anyhow;
use arcgraph::{SimplifyError, SimplifyOptions};
use geo::MultiPolygon;
use log::{debug, error, info, warn};
use rayon::prelude::*;

use crate::config::Configuration;
use crate::error::BoundaryError;
use crate::geom::{dissolve_by_key, Geometries};
use crate::pcode::PcodeNormalizer;
use crate::pipeline::{CountryFailure, CountryOutcome, CountryStage, RunSummary};
use crate::reconcile::{BoundaryReconciler, CountryOutlines, WaterMask};
use crate::schema::{map_fields, FieldRules};
use crate::source::BoundarySource;
use crate::store::GlobalMergeStore;
use crate::types::{Subdivision, SubdivisionRecord};

/// Per-country processing from source layer to store.
///
/// Countries are independent: each one is fetched, mapped, normalized,
/// simplified and reconciled on its own (optionally on a worker pool), and
/// the finished countries are merged into the store by the caller's thread.
pub struct Pipeline<'a> {
    config:     &'a Configuration,
    rules:      FieldRules,
    simplify:   SimplifyOptions,
    reconciler: BoundaryReconciler<'a>,
    cancel:     Option<&'a AtomicBool>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Configuration, outlines: &'a CountryOutlines, water: &'a WaterMask) -> anyhow::Result<Self> {
        Ok(Self {
            config,
            rules:      config.field_rules()?,
            simplify:   config.simplify_options(),
            reconciler: BoundaryReconciler::new(outlines, water)
                .with_edge_tolerance(config.reconcile.edge_tolerance),
            cancel:     None,
        })
    }

    /// Stop processing further stages once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn check_cancelled(&self, iso3: &str) -> Result<(), BoundaryError> {
        match self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(BoundaryError::Cancelled { iso3: iso3.to_string() }),
            _ => Ok(()),
        }
    }

    /// Run every stage up to reconciliation for one country.
    pub fn process_country(&self, iso3: &str, source: &dyn BoundarySource) -> Result<Vec<SubdivisionRecord>, CountryFailure> {
        let mut stage = CountryStage::Pending;
        self.run_stages(iso3, source, &mut stage)
            .map_err(|error| CountryFailure { stage, error })
    }

    fn run_stages(&self, iso3: &str, source: &dyn BoundarySource, stage: &mut CountryStage) -> Result<Vec<SubdivisionRecord>, BoundaryError> {
        let degenerate = |reason: String| BoundaryError::GeometryDegenerate { iso3: iso3.to_string(), reason };

        // ---- Schema mapping ----
        self.check_cancelled(iso3)?;
        let country = self.config.country(iso3)
            .ok_or_else(|| BoundaryError::UnknownCountry { iso3: iso3.to_string() })?;
        let mut layer = source.fetch(iso3)?;
        let dropped = layer.drop_null_geometries();
        if dropped > 0 {
            warn!("[pipeline] {iso3}: dropped {dropped} features without geometry");
        }
        if layer.is_empty() {
            return Err(degenerate("source layer has no polygon features".to_string()));
        }
        let mapping = map_fields(layer.fields(), &self.rules)
            .map_err(|source| BoundaryError::SchemaMapping { iso3: iso3.to_string(), source })?;
        debug!("[pipeline] {iso3}: name field {:?}, pcode field {:?}", mapping.name, mapping.pcode);
        *stage = CountryStage::SchemaMapped;

        // ---- Pcode normalization ----
        self.check_cancelled(iso3)?;
        let normalizer = PcodeNormalizer::new(&country.iso2, self.config.pcodes.numeric_rule);
        let pcodes = match &mapping.pcode {
            Some(field) => {
                let idx = layer.field_index(field).ok_or_else(|| anyhow!("[pipeline] field {field} vanished from {iso3}"))?;
                let pcodes = normalizer.from_column(field, &layer.column(idx));
                if !pcodes.synthesized.is_empty() {
                    warn!("[pipeline] {iso3}: {} rows had no {field}; codes synthesized from row order", pcodes.synthesized.len());
                }
                pcodes
            }
            None => {
                warn!("[pipeline] {iso3}: no pcode field; using sequential codes (unstable across source updates)");
                normalizer.sequential(layer.len())
            }
        };
        for collision in &pcodes.collisions {
            warn!("[pipeline] {iso3}: {collision}");
        }
        let name_idx = layer.field_index(&mapping.name)
            .ok_or_else(|| anyhow!("[pipeline] field {} vanished from {iso3}", mapping.name))?;
        let names: Vec<String> = layer.column(name_idx).iter()
            .map(|value| value.to_text().unwrap_or_default())
            .collect();
        *stage = CountryStage::PcodeNormalized;

        // ---- Dissolve and simplify ----
        self.check_cancelled(iso3)?;
        let mut first_name: ahash::AHashMap<&str, &str> = ahash::AHashMap::new();
        for (code, name) in pcodes.codes.iter().zip(&names) {
            first_name.entry(code.as_str()).or_insert(name.as_str());
        }
        let dissolved: Vec<(String, MultiPolygon<f64>)> = dissolve_by_key(
            layer.features().iter().zip(&pcodes.codes)
                .filter_map(|(feature, code)| Some((code.clone(), feature.geometry.clone()?)))
        );
        let (codes, shapes): (Vec<String>, Vec<MultiPolygon<f64>>) = dissolved.into_iter().unzip();

        let geoms = Geometries::new(shapes);
        let simplified = geoms.simplify(&self.simplify).map_err(|e| match e {
            SimplifyError::EmptyFeature(i) => degenerate(format!("subdivision {} was emptied by simplification", codes[i])),
            other => degenerate(other.to_string()),
        })?;
        debug!("[pipeline] {iso3}: simplified {} subdivisions from {} to {} vertices",
            codes.len(), geoms.num_coords(), simplified.num_coords());
        *stage = CountryStage::Simplified;

        // ---- Reconciliation ----
        self.check_cancelled(iso3)?;
        let subdivisions: Vec<Subdivision> = codes.iter().zip(simplified.into_shapes())
            .map(|(code, geometry)| Subdivision {
                code: code.clone(),
                name: first_name.get(code.as_str()).copied().unwrap_or_default().to_string(),
                geometry,
            })
            .collect();
        let reconciled = self.reconciler.reconcile(iso3, subdivisions)?;
        *stage = CountryStage::Reconciled;

        Ok(reconciled.subdivisions.into_iter()
            .map(|subdivision| SubdivisionRecord::new(&country, subdivision))
            .collect())
    }

    /// Process every country, in parallel when configured.
    fn process_all(&self, countries: &[String], source: &dyn BoundarySource) -> Vec<Result<Vec<SubdivisionRecord>, CountryFailure>> {
        if let Some(workers) = self.config.pipeline.workers.filter(|&n| n > 1) {
            match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
                Ok(pool) => {
                    return pool.install(|| countries.par_iter()
                        .map(|iso3| self.process_country(iso3, source))
                        .collect());
                }
                Err(e) => warn!("[pipeline] could not start {workers} workers ({e}); running sequentially"),
            }
        }
        countries.iter().map(|iso3| self.process_country(iso3, source)).collect()
    }

    fn merge(&self, iso3: &str, records: Vec<SubdivisionRecord>, store: &mut GlobalMergeStore) -> Result<usize, CountryFailure> {
        let fail = |error| CountryFailure { stage: CountryStage::Reconciled, error };
        self.check_cancelled(iso3).map_err(fail)?;
        let count = records.len();
        store.upsert_country(iso3, records).map_err(fail)?;
        Ok(count)
    }

    /// Process `countries` and merge each success into `store`.
    /// A failing country is logged and leaves its previous records untouched.
    pub fn run(&self, countries: &[String], source: &dyn BoundarySource, store: &mut GlobalMergeStore) -> RunSummary {
        info!("[pipeline] processing {} countries", countries.len());
        let results = self.process_all(countries, source);

        let outcomes = countries.iter().zip(results)
            .map(|(iso3, result)| match result.and_then(|records| self.merge(iso3, records, store)) {
                Ok(subdivisions) => {
                    info!("[pipeline] {iso3}: merged {subdivisions} subdivisions");
                    CountryOutcome::Merged { iso3: iso3.clone(), subdivisions }
                }
                Err(failure) => {
                    error!("[pipeline] {iso3}: {failure}");
                    CountryOutcome::Failed { iso3: iso3.clone(), stage: failure.stage, reason: failure.error.to_string() }
                }
            })
            .collect();

        RunSummary { outcomes }
    }
}

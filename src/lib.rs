#![doc = "Admin1 boundary harmonization public API"]
mod common;
mod config;
mod error;
mod geom;
mod io;
mod pcode;
mod pipeline;
mod reconcile;
mod schema;
mod source;
mod store;
mod types;

#[doc(inline)]
pub use arcgraph::SimplifyOptions;

#[doc(inline)]
pub use config::Configuration;

#[doc(inline)]
pub use error::{BoundaryError, PcodeCollision, RegionLookupGap, SchemaMappingError};

#[doc(inline)]
pub use types::{AttrValue, CountryInfo, SourceFeature, SourceLayer, Subdivision, SubdivisionRecord};

#[doc(inline)]
pub use schema::{map_fields, FieldMapping, FieldMatcher, FieldRules};

#[doc(inline)]
pub use pcode::{is_code_like, NumericPcodeRule, PcodeNormalizer, Pcodes};

#[doc(inline)]
pub use reconcile::{BoundaryReconciler, CountryOutlines, OutlineFeature, Reconciled, WaterMask};

#[doc(inline)]
pub use source::{BoundarySource, DatasetDir, DiskSource, MemSource};

#[doc(inline)]
pub use store::{
    apply_region_template, display_name, region_features, CentroidRecord, GlobalMergeStore,
    LookupRecord, PopulationTable, RegionAssignment, RegionFeature, RegionalBbox, StatRecord,
    HEALTH_FACILITIES, HRP_GROUP, POPULATION,
};

#[doc(inline)]
pub use pipeline::{select_countries, CountryFailure, CountryOutcome, CountrySelection, CountryStage, Pipeline, RunSummary};

#[doc(inline)]
pub use io::geojson::{
    read_country_outlines, read_region_template, read_subdivisions, read_water_mask,
    write_centroids, write_regions, write_subdivisions, ADM0_PCODE, ADM0_REF, ADM1_PCODE,
    ADM1_REF, ALPHA_3, CRS84,
};

#[doc(inline)]
pub use io::csv::{read_population_table, read_region_assignment, write_stat_table, PopulationColumns};

#[doc(inline)]
pub use io::{lookup::write_lookup, shp::{read_points, read_source_layer}};

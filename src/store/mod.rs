mod derive;
mod regions;
mod stats;
mod store;

pub use derive::{display_name, CentroidRecord, LookupRecord};
pub use regions::{apply_region_template, region_features, RegionAssignment, RegionFeature, RegionalBbox, HRP_GROUP};
pub use stats::{PopulationTable, StatRecord, HEALTH_FACILITIES, POPULATION};
pub use store::GlobalMergeStore;

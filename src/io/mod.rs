//! IO module for format-specific reading and writing operations.
//!
//! # Format Modules
//!
//! - `csv` - regional office and population tables, per-subdivision statistics
//! - `geojson` - admin0 outlines, water, published admin1 layers, centroids, regional boxes
//! - `shp` - per-country source shapefiles and facility points
//! - `lookup` - admin1 attribute lookup text files

pub(crate) mod csv;
pub(crate) mod geojson;
pub(crate) mod lookup;
pub(crate) mod shp;

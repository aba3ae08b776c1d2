mod algorithm;
mod bbox;
mod geom;

use bbox::BoundingBox;
pub(crate) use algorithm::{dissolve_by_key, shared_boundary_length};
pub(crate) use bbox::{envelope_of, merge_rects};
pub(crate) use geom::{union_all, Geometries};

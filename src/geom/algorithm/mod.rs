mod dissolve;
mod edges;

pub(crate) use dissolve::dissolve_by_key;
pub(crate) use edges::shared_boundary_length;

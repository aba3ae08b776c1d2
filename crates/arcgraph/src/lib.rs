pub mod ids;
pub mod simplify;
pub mod topology;

pub use ids::{ArcId, VertexId};
pub use simplify::{simplify, SimplifyError, SimplifyOptions};
pub use topology::{Arc, ArcRef, Feature, PolygonRings, Ring, Topology};

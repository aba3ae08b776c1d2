mod attr;
mod layer;
mod record;

pub use attr::AttrValue;
pub use layer::{SourceFeature, SourceLayer};
pub use record::{CountryInfo, Subdivision, SubdivisionRecord};

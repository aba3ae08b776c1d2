mod pipeline;
mod select;
mod stage;

pub use pipeline::Pipeline;
pub use select::{select_countries, CountrySelection};
pub use stage::{CountryFailure, CountryOutcome, CountryStage, RunSummary};

//! CSV format reading and writing operations.

mod read;
mod write;

pub use read::{read_population_table, read_region_assignment, PopulationColumns};
pub use write::write_stat_table;

use std::fmt;

use thiserror::Error;

/// No field of a source layer could serve as the subdivision name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no subdivision name field among {fields:?}")]
pub struct SchemaMappingError {
    pub fields: Vec<String>,
}

/// Per-country failure taxonomy. Every variant stops at the orchestrator,
/// which marks the country failed and moves on to the next one.
#[derive(Debug, Error)]
pub enum BoundaryError {
    #[error("schema mapping failed for {iso3}: {source}")]
    SchemaMapping {
        iso3: String,
        #[source]
        source: SchemaMappingError,
    },

    #[error("boundary data unavailable for {iso3}: {reason}")]
    Download { iso3: String, reason: String },

    #[error("degenerate geometry for {iso3}: {reason}")]
    GeometryDegenerate { iso3: String, reason: String },

    #[error("no canonical outline matches {code}")]
    MissingOutline { code: String },

    #[error("{iso3} is not listed under `countries` in the configuration")]
    UnknownCountry { iso3: String },

    #[error("invalid records for {iso3}: {reason}")]
    InvalidRecords { iso3: String, reason: String },

    #[error("processing of {iso3} was cancelled")]
    Cancelled { iso3: String },

    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

// ---- Warnings ----

/// Two or more source rows produced the same subdivision code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcodeCollision {
    pub pcode: String,
    /// Zero-based source rows sharing the code, in row order.
    pub rows: Vec<usize>,
}

impl fmt::Display for PcodeCollision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pcode {} is shared by rows {:?}", self.pcode, self.rows)
    }
}

/// A region in the bounding-box template had no computed counterpart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionLookupGap {
    pub region: String,
}

impl fmt::Display for RegionLookupGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "region {:?} has no computed bounding box", self.region)
    }
}

use std::fmt;

use crate::error::BoundaryError;

/// Where a country is in its processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CountryStage {
    Pending,
    SchemaMapped,
    PcodeNormalized,
    Simplified,
    Reconciled,
    Merged,
}

impl fmt::Display for CountryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CountryStage::Pending         => "PENDING",
            CountryStage::SchemaMapped    => "SCHEMA_MAPPED",
            CountryStage::PcodeNormalized => "PCODE_NORMALIZED",
            CountryStage::Simplified      => "SIMPLIFIED",
            CountryStage::Reconciled      => "RECONCILED",
            CountryStage::Merged          => "MERGED",
        })
    }
}

/// A country that stopped early: the last stage it completed and why it stopped.
#[derive(Debug)]
pub struct CountryFailure {
    pub stage: CountryStage,
    pub error: BoundaryError,
}

impl fmt::Display for CountryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed after {}: {}", self.stage, self.error)
    }
}

/// Terminal state of one country in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountryOutcome {
    Merged { iso3: String, subdivisions: usize },
    Failed { iso3: String, stage: CountryStage, reason: String },
}

impl CountryOutcome {
    pub fn iso3(&self) -> &str {
        match self {
            CountryOutcome::Merged { iso3, .. } | CountryOutcome::Failed { iso3, .. } => iso3,
        }
    }

    #[inline] pub fn is_merged(&self) -> bool { matches!(self, CountryOutcome::Merged { .. }) }
}

impl fmt::Display for CountryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountryOutcome::Merged { iso3, subdivisions } => write!(f, "{iso3}: MERGED ({subdivisions} subdivisions)"),
            CountryOutcome::Failed { iso3, stage, reason } => write!(f, "{iso3}: FAILED after {stage}: {reason}"),
        }
    }
}

/// Terminal states of every country in a run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub outcomes: Vec<CountryOutcome>,
}

impl RunSummary {
    pub fn merged(&self) -> impl Iterator<Item = &CountryOutcome> {
        self.outcomes.iter().filter(|o| o.is_merged())
    }

    pub fn failed(&self) -> impl Iterator<Item = &CountryOutcome> {
        self.outcomes.iter().filter(|o| !o.is_merged())
    }

    pub fn outcome(&self, iso3: &str) -> Option<&CountryOutcome> {
        self.outcomes.iter().find(|o| o.iso3() == iso3)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} merged, {} failed", self.merged().count(), self.failed().count())?;
        for outcome in &self.outcomes {
            writeln!(f, "  {outcome}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_lists_terminal_states() {
        let summary = RunSummary {
            outcomes: vec![
                CountryOutcome::Merged { iso3: "AFG".into(), subdivisions: 34 },
                CountryOutcome::Failed { iso3: "SDN".into(), stage: CountryStage::Pending, reason: "boom".into() },
            ],
        };
        assert_eq!(summary.merged().count(), 1);
        assert_eq!(summary.to_string(),
            "1 merged, 1 failed\n  AFG: MERGED (34 subdivisions)\n  SDN: FAILED after PENDING: boom\n");
    }
}

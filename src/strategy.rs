use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::filter::FilterRule;
use crate::flap::Flap;
use crate::inax1::InAx1;
use crate::lineage;
use crate::matcher::{CandidateMatch, Exclusion, MatchRule};
use crate::record::{MutantContext, MutationRecord};
use crate::report::{self, ReportFormat, ReportMode};

pub trait Strategy {
    /// Short lower-case name, also the output directory name.
    fn name(&self) -> &'static str;

    fn rule(&self) -> &MatchRule;

    fn filter_rules(&self) -> &[FilterRule];

    /// Rewrite one accepted match into the context's buffer and record it.
    fn apply(&self, candidate: &CandidateMatch<'_>, ctx: &mut MutantContext) -> Result<()>;

    fn report_format(&self) -> &ReportFormat;

    /// Finalize a mutant: resolve lineage and write the report into `dir`.
    fn on_created_mutant(&self, dir: &Utf8Path, records: &[MutationRecord]) -> Result<Vec<MutationRecord>> {
        let resolved = lineage::resolve(records);
        report::write_report(dir, self.report_format(), &resolved)?;
        Ok(resolved)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Flap,
    Inax1,
}

impl StrategyKind {
    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::Flap => "flap",
            StrategyKind::Inax1 => "inax1",
        }
    }
}

/// User-tunable parts of a strategy. `None` keeps the strategy default.
#[derive(Debug, Clone, Default)]
pub struct StrategyOptions {
    pub exclusions: Option<Vec<Exclusion>>,
    pub report_name: Option<String>,
    pub report_mode: Option<ReportMode>,
}

pub fn build(kind: StrategyKind, options: &StrategyOptions) -> Box<dyn Strategy> {
    match kind {
        StrategyKind::Flap => Box::new(Flap::with_options(options)),
        StrategyKind::Inax1 => Box::new(InAx1::with_options(options)),
    }
}

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::filter::{self, Rejection, Verdict};
use crate::matcher::Matches;
use crate::record::{MutantContext, MutationRecord};
use crate::strategy::Strategy;
use crate::syntax::{self, SyntaxTree};
use crate::types::Numeric;

pub const MANIFEST_NAME: &str = "mutant.json";

/// One generated variant of a source file, before it is written out.
#[derive(Debug)]
pub struct Mutant {
    pub strategy: &'static str,
    pub original: String,
    pub mutated: String,
    /// Records in the order they were applied, lineage not yet resolved
    pub records: Vec<MutationRecord>,
    pub rejected: usize,
    pub failed: usize,
}

/// What ends up in `mutant.json` next to the mutated file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub strategy: String,
    pub source: Utf8PathBuf,
    pub mutated: Utf8PathBuf,
    pub report: Utf8PathBuf,
    pub records: Vec<MutationRecord>,
    pub rejected: usize,
    pub failed: usize,
}

/// A structural candidate together with what the filter made of it.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateSummary {
    pub line: usize,
    pub operator: String,
    pub op_type: Numeric,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
}

impl CandidateSummary {
    pub fn accepted(&self) -> bool {
        self.rejection.is_none()
    }
}

fn scoped_matches<'t, 'r>(
    tree: &'t SyntaxTree,
    strategy: &'r dyn Strategy,
    function: Option<&str>,
) -> Result<Matches<'t, 'r>> {
    match function {
        None => Ok(Matches::new(tree, strategy.rule())),
        Some(name) => {
            let node = syntax::find_function(tree.root(), name, tree.source()).ok_or_else(|| {
                Error::UnknownFunction {
                    name: name.to_string(),
                    available: syntax::list_functions(tree),
                }
            })?;
            Ok(Matches::within(tree, strategy.rule(), node))
        }
    }
}

/// Run every candidate through the filter and apply the accepted ones to a
/// fresh context. A match that fails is logged and counted; the rest of
/// the file is still processed.
pub fn generate_mutant(tree: &SyntaxTree, strategy: &dyn Strategy, function: Option<&str>) -> Result<Mutant> {
    let mut ctx = MutantContext::new(tree.source());
    let mut rejected = 0;
    let mut failed = 0;

    for candidate in scoped_matches(tree, strategy, function)? {
        let candidate = match candidate {
            Ok(c) => c,
            Err(e) => {
                log::warn!("{e}");
                failed += 1;
                continue;
            }
        };
        match filter::evaluate(strategy.filter_rules(), &candidate, tree.source()) {
            Verdict::Accept => {
                if let Err(e) = strategy.apply(&candidate, &mut ctx) {
                    log::warn!("line {}: {e}", candidate.line());
                    failed += 1;
                }
            }
            Verdict::Reject(_) => rejected += 1,
        }
    }

    let (buffer, records) = ctx.into_parts();
    log::info!(
        "{}: {} mutations, {rejected} rejected, {failed} failed",
        strategy.name(),
        records.len()
    );
    Ok(Mutant {
        strategy: strategy.name(),
        original: tree.source().to_string(),
        mutated: buffer.finish(),
        records,
        rejected,
        failed,
    })
}

/// Every structural candidate with its verdict, nothing rewritten.
pub fn list_candidates(
    tree: &SyntaxTree,
    strategy: &dyn Strategy,
    function: Option<&str>,
) -> Result<Vec<CandidateSummary>> {
    let mut summaries = Vec::new();
    for candidate in scoped_matches(tree, strategy, function)? {
        let candidate = match candidate {
            Ok(c) => c,
            Err(e) => {
                log::warn!("{e}");
                continue;
            }
        };
        let rejection = match filter::evaluate(strategy.filter_rules(), &candidate, tree.source()) {
            Verdict::Accept => None,
            Verdict::Reject(reason) => Some(reason),
        };
        summaries.push(CandidateSummary {
            line: candidate.line(),
            operator: candidate.op.symbol().to_string(),
            op_type: candidate.op_type,
            text: tree.text(candidate.node).to_string(),
            rejection,
        });
    }
    Ok(summaries)
}

/// `<out>/<strategy>/<file name>/`
pub fn mutant_dir(out: &Utf8Path, strategy: &str, source: &Utf8Path) -> Utf8PathBuf {
    out.join(strategy).join(source.file_name().unwrap_or("mutant"))
}

/// Write the mutated file, run the strategy's finalization (lineage and
/// report) and write the manifest.
pub fn write_mutant(
    mutant: &Mutant,
    strategy: &dyn Strategy,
    source: &Utf8Path,
    out: &Utf8Path,
) -> Result<Manifest> {
    let dir = mutant_dir(out, strategy.name(), source);
    std::fs::create_dir_all(&dir)?;

    let file_name = source.file_name().ok_or_else(|| Error::UnsupportedFile(source.to_path_buf()))?;
    let mutated = dir.join(file_name);
    write_atomic(&mutated, &mutant.mutated)?;

    let records = strategy.on_created_mutant(&dir, &mutant.records)?;
    let manifest = Manifest {
        strategy: mutant.strategy.to_string(),
        source: source.to_path_buf(),
        mutated,
        report: dir.join(&strategy.report_format().file_name),
        records,
        rejected: mutant.rejected,
        failed: mutant.failed,
    };
    write_atomic(&dir.join(MANIFEST_NAME), &serde_json::to_string_pretty(&manifest)?)?;
    Ok(manifest)
}

fn write_atomic(path: &Utf8Path, contents: &str) -> Result<()> {
    let dir = path.parent().unwrap_or(Utf8Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.persist(path).map_err(|e| e.error)?;
    log::debug!("wrote {path}");
    Ok(())
}

pub fn load_manifest(dir: &Utf8Path) -> Result<Manifest> {
    let data = std::fs::read_to_string(dir.join(MANIFEST_NAME))?;
    Ok(serde_json::from_str(&data)?)
}

pub fn generate_diff(original: &str, mutated: &str) -> String {
    use similar::TextDiff;
    let diff = TextDiff::from_lines(original, mutated);
    let mut output = String::new();
    for change in diff.iter_all_changes() {
        match change.tag() {
            similar::ChangeTag::Delete => {
                output.push_str(&format!("- {}", change));
            }
            similar::ChangeTag::Insert => {
                output.push_str(&format!("+ {}", change));
            }
            _ => {}
        }
    }
    output
}

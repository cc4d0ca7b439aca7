use approx_mutator::flap::{self, Flap};
use approx_mutator::inax1::{self, InAx1};
use approx_mutator::record::MutationRecord;
use approx_mutator::report::{self, Columns};
use approx_mutator::runner;
use approx_mutator::{Dialect, Error, SyntaxTree};
use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

const SOURCE: &str = "\
float dot(float a, float b, float c, float d) {
    float r;
    r = a * b;
    r = r + c * d;
    return r;
}

int count(int a, int b, int c) {
    int n;
    n = a + b + c;
    return n;
}
";

fn utf8(dir: &TempDir) -> Utf8PathBuf {
    Utf8Path::from_path(dir.path()).unwrap().to_path_buf()
}

// --- generate_mutant ---

#[test]
fn generate_mutant_counts_rejections() {
    let tree = SyntaxTree::parse(SOURCE, Dialect::C).unwrap();
    let mutant = runner::generate_mutant(&tree, &Flap::default(), None).unwrap();
    assert_eq!(mutant.strategy, "flap");
    assert_eq!(mutant.records.len(), 3);
    // two `=` assignments on floats
    assert_eq!(mutant.rejected, 2);
    assert_eq!(mutant.failed, 0);
    assert_eq!(mutant.original, SOURCE);
}

#[test]
fn generate_mutant_scoped_to_function() {
    let tree = SyntaxTree::parse(SOURCE, Dialect::C).unwrap();
    let mutant = runner::generate_mutant(&tree, &InAx1::default(), Some("count")).unwrap();
    assert_eq!(mutant.records.len(), 2);
    assert!(mutant.mutated.contains("int nab_0 = 0;\nint nab_1 = 0;\nint count("));

    let none = runner::generate_mutant(&tree, &InAx1::default(), Some("dot")).unwrap();
    assert!(none.records.is_empty());
}

#[test]
fn unknown_function_lists_available_ones() {
    let tree = SyntaxTree::parse(SOURCE, Dialect::C).unwrap();
    let err = runner::generate_mutant(&tree, &Flap::default(), Some("missing")).unwrap_err();
    match err {
        Error::UnknownFunction { name, available } => {
            assert_eq!(name, "missing");
            assert_eq!(available, vec!["dot", "count"]);
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn list_candidates_reports_verdicts() {
    let tree = SyntaxTree::parse(SOURCE, Dialect::C).unwrap();
    let candidates = runner::list_candidates(&tree, &InAx1::default(), None).unwrap();
    assert_eq!(candidates.len(), 2);
    assert!(candidates[0].accepted());
    assert_eq!(candidates[0].text, "a + b");
    assert!(!candidates[1].accepted());
    assert_eq!(candidates[1].line, 10);
}

// --- write_mutant ---

#[test]
fn write_mutant_lays_out_directory() {
    let tmp = TempDir::new().unwrap();
    let root = utf8(&tmp);
    let source_path = root.join("kernels.c");
    std::fs::write(&source_path, SOURCE).unwrap();
    let out = root.join("out");

    let tree = SyntaxTree::parse(SOURCE, Dialect::C).unwrap();
    let strategy = Flap::default();
    let mutant = runner::generate_mutant(&tree, &strategy, None).unwrap();
    let manifest = runner::write_mutant(&mutant, &strategy, &source_path, &out).unwrap();

    let dir = out.join("flap").join("kernels.c");
    assert_eq!(manifest.mutated, dir.join("kernels.c"));
    assert_eq!(manifest.report, dir.join(flap::REPORT_NAME));
    assert_eq!(std::fs::read_to_string(&manifest.mutated).unwrap(), mutant.mutated);

    let report = std::fs::read_to_string(&manifest.report).unwrap();
    let lines: Vec<_> = report.lines().collect();
    assert_eq!(
        lines,
        vec![
            "OP_0,3,FLOAT,MUL,\"a\",\"b\",\"r\"",
            "OP_1,4,FLOAT,MUL,\"c\",\"d\",\"NULL\"",
            "OP_2,4,FLOAT,ADD,\"OP_0\",\"OP_1\",\"r\"",
        ]
    );

    let loaded = runner::load_manifest(&dir).unwrap();
    let lines = |records: &[MutationRecord]| {
        records.iter().map(|r| report::render_line(r, Columns::Full)).collect::<Vec<_>>()
    };
    assert_eq!(lines(&loaded.records), lines(&manifest.records));
    // source positions only live for the duration of a run
    assert!(manifest.records[0].span.is_some());
    assert_eq!(loaded.records[0].span, None);
    assert_eq!(loaded.rejected, 2);
}

#[test]
fn inax1_report_appends_across_runs() {
    let tmp = TempDir::new().unwrap();
    let root = utf8(&tmp);
    let source_path = root.join("count.c");
    std::fs::write(&source_path, SOURCE).unwrap();

    let tree = SyntaxTree::parse(SOURCE, Dialect::C).unwrap();
    let strategy = InAx1::default();
    let mutant = runner::generate_mutant(&tree, &strategy, Some("count")).unwrap();
    runner::write_mutant(&mutant, &strategy, &source_path, &root).unwrap();
    let manifest = runner::write_mutant(&mutant, &strategy, &source_path, &root).unwrap();

    assert_eq!(manifest.report, root.join("inax1").join("count.c").join(inax1::REPORT_NAME));
    let report = std::fs::read_to_string(&manifest.report).unwrap();
    assert_eq!(report.lines().count(), 4);
    assert!(report.starts_with("nab_0,10,\"a\",\"b\",\"NULL\"\nnab_1,10,\"nab_0\",\"c\",\"n\"\n"));
}

#[test]
fn sources_sharing_a_stem_get_separate_directories() {
    let out = Utf8Path::new("out");
    let c = runner::mutant_dir(out, "inax1", Utf8Path::new("src/count.c"));
    let cpp = runner::mutant_dir(out, "inax1", Utf8Path::new("src/count.cpp"));
    assert_eq!(c, Utf8Path::new("out/inax1/count.c"));
    assert_eq!(cpp, Utf8Path::new("out/inax1/count.cpp"));
}

// --- generate_diff ---

#[test]
fn generate_diff_shows_changes() {
    let original = "line1\nline2\nline3\n";
    let mutated = "line1\nchanged\nline3\n";
    let diff = runner::generate_diff(original, mutated);
    assert!(diff.contains("- line2"));
    assert!(diff.contains("+ changed"));
}

#[test]
fn generate_diff_identical_returns_empty() {
    let source = "no changes\n";
    let diff = runner::generate_diff(source, source);
    assert!(diff.is_empty());
}

#[test]
fn generate_diff_added_line() {
    let original = "a\nb\n";
    let mutated = "a\nb\nc\n";
    let diff = runner::generate_diff(original, mutated);
    assert!(diff.contains("+ c"));
    assert!(!diff.contains("- "));
}

use console::Style;

use crate::runner::{CandidateSummary, Manifest};
use crate::state::RunSummary;

pub fn print_error(msg: &str) {
    let style = Style::new().red().bold();
    eprintln!("{} {}", style.apply_to("✗"), msg);
}

pub fn print_manifest(manifest: &Manifest) {
    let count = manifest.records.len();
    if manifest.failed == 0 {
        let style = Style::new().green().bold();
        println!(
            "{} {}: {} mutations ({} rejected) → {}",
            style.apply_to("✓"),
            manifest.source,
            count,
            manifest.rejected,
            manifest.mutated,
        );
    } else {
        let style = Style::new().yellow().bold();
        println!(
            "{} {}: {} mutations ({} rejected, {} failed) → {}",
            style.apply_to("!"),
            manifest.source,
            count,
            manifest.rejected,
            manifest.failed,
            manifest.mutated,
        );
    }

    let id_style = Style::new().cyan().bold();
    let dim = Style::new().dim();
    let op_style = Style::new().magenta();
    for record in &manifest.records {
        println!(
            "  {} {} {} {} {}, {}{}",
            id_style.apply_to(&record.id),
            dim.apply_to(format!("line {}", record.line)),
            dim.apply_to(format!("[{} {}]", record.result_type.report_name(), record.operator.name())),
            op_style.apply_to(record.operator.symbol()),
            record.operands[0].text,
            record.operands[1].text,
            record
                .assigned_to
                .as_ref()
                .map(|name| format!(" → {name}"))
                .unwrap_or_default(),
        );
    }
}

pub fn print_diff(diff: &str) {
    for line in diff.lines() {
        if line.starts_with('-') {
            let del_style = Style::new().red();
            println!("  {}", del_style.apply_to(line));
        } else if line.starts_with('+') {
            let add_style = Style::new().green();
            println!("  {}", add_style.apply_to(line));
        }
    }
}

pub fn print_candidates(candidates: &[CandidateSummary], file: &str) {
    let accepted = candidates.iter().filter(|c| c.accepted()).count();
    println!("{file}: {} candidates, {accepted} accepted", candidates.len());

    let ok = Style::new().green();
    let dim = Style::new().dim();
    for candidate in candidates {
        let verdict = match &candidate.rejection {
            None => ok.apply_to("accept".to_string()),
            Some(reason) => dim.apply_to(format!("reject: {reason}")),
        };
        println!(
            "  {} {} {} {}",
            dim.apply_to(format!("{:>4}", candidate.line)),
            Style::new().magenta().apply_to(format!("{:<3}", candidate.operator)),
            candidate.text,
            verdict,
        );
    }
}

pub fn print_status(summary: &RunSummary) {
    println!(
        "Last run: {} strategy, {} mutants, {} mutations written to {}",
        summary.strategy,
        summary.mutants.len(),
        summary.total_mutations(),
        summary.out,
    );
    let dim = Style::new().dim();
    for mutant in &summary.mutants {
        println!(
            "  {} {} mutations, {} rejected, {} failed {}",
            mutant.source,
            mutant.mutations,
            mutant.rejected,
            mutant.failed,
            dim.apply_to(format!("({})", mutant.dir)),
        );
    }
    for error in &summary.errors {
        print_error(error);
    }
}

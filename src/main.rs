use approx_mutator::matcher::Exclusion;
use approx_mutator::report::ReportMode;
use approx_mutator::runner;
use approx_mutator::output;
use approx_mutator::state::{self, MutantSummary, RunSummary};
use approx_mutator::strategy::{self, Strategy, StrategyKind, StrategyOptions};
use approx_mutator::{Error, SyntaxTree};

use std::process;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "approx-mutator", version, about = "Arithmetic mutants for approximate computing experiments")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one mutant per source file
    Run {
        /// C or C++ source files to mutate
        #[arg(required = true)]
        files: Vec<Utf8PathBuf>,
        /// Mutation strategy
        #[arg(short, long, value_enum, env = "APPROX_MUTATOR_STRATEGY")]
        strategy: StrategyKind,
        /// Output root; mutants go to <out>/<strategy>/<file name>/
        #[arg(short, long, env = "APPROX_MUTATOR_OUT", default_value = "mutants")]
        out: Utf8PathBuf,
        /// Report file name (default depends on the strategy)
        #[arg(long)]
        report_name: Option<String>,
        /// Truncate or append to an existing report
        #[arg(long, value_enum)]
        report_mode: Option<ReportMode>,
        /// Ancestor contexts to skip: call, subscript, or a grammar node kind
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<Exclusion>,
        /// Function name to scope mutations to
        #[arg(short, long)]
        function: Option<String>,
        /// Print a diff of each mutant against its source
        #[arg(long)]
        diff: bool,
        /// Output JSON instead of human-readable text
        #[arg(long)]
        json: bool,
        /// Exit code only, no output
        #[arg(short, long)]
        quiet: bool,
    },
    /// List the candidate expressions of a file and what the filter says
    List {
        /// C or C++ source file
        file: Utf8PathBuf,
        #[arg(short, long, value_enum, env = "APPROX_MUTATOR_STRATEGY")]
        strategy: StrategyKind,
        /// Ancestor contexts to skip: call, subscript, or a grammar node kind
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<Exclusion>,
        /// Function name to scope the listing to
        #[arg(short, long)]
        function: Option<String>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Summary of last run
    Status {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

struct RunArgs {
    strategy: StrategyKind,
    out: Utf8PathBuf,
    function: Option<String>,
    diff: bool,
    json: bool,
    quiet: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Run {
            files,
            strategy,
            out,
            report_name,
            report_mode,
            exclude,
            function,
            diff,
            json,
            quiet,
        } => {
            let options = StrategyOptions {
                exclusions: (!exclude.is_empty()).then_some(exclude),
                report_name,
                report_mode,
            };
            let args = RunArgs { strategy, out, function, diff, json, quiet };
            cmd_run(&files, &options, &args)
        }
        Commands::List { file, strategy, exclude, function, json } => {
            let options = StrategyOptions {
                exclusions: (!exclude.is_empty()).then_some(exclude),
                ..StrategyOptions::default()
            };
            cmd_list(&file, strategy, &options, function.as_deref(), json)
        }
        Commands::Status { json } => cmd_status(json),
    };

    process::exit(exit_code);
}

/// Usage problems exit with 2, everything else with 3.
fn exit_code_for(error: &Error) -> i32 {
    match error {
        Error::UnsupportedFile(_) | Error::UnknownFunction { .. } => 2,
        _ => 3,
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => println!("{json}"),
        Err(e) => output::print_error(&format!("Failed to serialize output: {e}")),
    }
}

fn parse_file(path: &Utf8Path) -> Result<SyntaxTree, Error> {
    let dialect =
        approx_mutator::detect_dialect(path.as_std_path()).ok_or_else(|| Error::UnsupportedFile(path.to_path_buf()))?;
    let source = std::fs::read_to_string(path)?;
    SyntaxTree::parse(&source, dialect)
}

fn cmd_run(files: &[Utf8PathBuf], options: &StrategyOptions, args: &RunArgs) -> i32 {
    let strategy = strategy::build(args.strategy, options);
    let mut summary = RunSummary {
        strategy: strategy.name().to_string(),
        out: args.out.clone(),
        mutants: Vec::new(),
        errors: Vec::new(),
    };
    let mut manifests = Vec::new();
    let mut exit_code = 0;

    for file in files {
        if !file.exists() {
            let msg = format!("Source file not found: {file}. Check the path and try again.");
            if !args.quiet {
                output::print_error(&msg);
            }
            summary.errors.push(msg);
            exit_code = exit_code.max(2);
            continue;
        }
        match run_file(file, strategy.as_ref(), args) {
            Ok(manifest) => {
                summary.mutants.push(MutantSummary {
                    source: file.clone(),
                    dir: runner::mutant_dir(&args.out, strategy.name(), file),
                    mutations: manifest.records.len(),
                    rejected: manifest.rejected,
                    failed: manifest.failed,
                });
                manifests.push(manifest);
            }
            Err(e) => {
                let msg = format!("{file}: {e}");
                if !args.quiet {
                    output::print_error(&msg);
                }
                summary.errors.push(msg);
                exit_code = exit_code.max(exit_code_for(&e));
            }
        }
    }

    state::save_last_run(&summary);

    if args.json && !args.quiet {
        print_json(&manifests);
    }
    exit_code
}

fn run_file(file: &Utf8Path, strategy: &dyn Strategy, args: &RunArgs) -> Result<runner::Manifest, Error> {
    let tree = parse_file(file)?;
    let mutant = runner::generate_mutant(&tree, strategy, args.function.as_deref())?;
    let manifest = runner::write_mutant(&mutant, strategy, file, &args.out)?;

    if !args.quiet && !args.json {
        output::print_manifest(&manifest);
        if args.diff {
            output::print_diff(&runner::generate_diff(&mutant.original, &mutant.mutated));
        }
    }
    Ok(manifest)
}

fn cmd_list(
    file: &Utf8Path,
    kind: StrategyKind,
    options: &StrategyOptions,
    function: Option<&str>,
    json_mode: bool,
) -> i32 {
    let strategy = strategy::build(kind, options);
    let candidates = parse_file(file).and_then(|tree| runner::list_candidates(&tree, strategy.as_ref(), function));
    match candidates {
        Ok(candidates) => {
            if json_mode {
                print_json(&candidates);
            } else {
                output::print_candidates(&candidates, file.as_str());
            }
            0
        }
        Err(e) => {
            output::print_error(&format!("{file}: {e}"));
            exit_code_for(&e)
        }
    }
}

fn cmd_status(json_mode: bool) -> i32 {
    match state::load_last_run() {
        Some(summary) => {
            if json_mode {
                print_json(&summary);
            } else {
                output::print_status(&summary);
            }
            0
        }
        None => {
            output::print_error("No previous run found. Run `approx-mutator run` first.");
            2
        }
    }
}

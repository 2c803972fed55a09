use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use pagecheck::checks::{CheckId, Outcome};
use pagecheck::runner::{run_checks, RunConfig, RunReport};
use pagecheck::static_backend::StaticSurface;
use pagecheck::HarnessConfig;

/// Verification harness for a static landing page: structure, accessibility,
/// links, responsive layout, and visual baselines.
#[derive(Parser, Debug)]
#[command(name = "pagecheck", version, about)]
struct Cli {
    /// Base address of the page under test
    #[arg(long)]
    base_url: String,

    /// Check families to run (default: all)
    #[arg(long, value_enum, value_delimiter = ',')]
    checks: Vec<CheckId>,

    /// Directory holding baseline screenshots
    #[arg(long, default_value = "baselines")]
    baseline_dir: PathBuf,

    /// Rewrite visual baselines instead of comparing against them
    #[arg(long)]
    update_baselines: bool,

    /// Wall-clock budget per check, in milliseconds
    #[arg(long, default_value_t = 60000)]
    timeout_ms: u64,

    /// Run checks one at a time instead of in parallel
    #[arg(long)]
    sequential: bool,

    /// Emit the report as JSON instead of human-readable text
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let config = RunConfig {
        base_url: cli.base_url,
        checks: if cli.checks.is_empty() {
            CheckId::ALL.to_vec()
        } else {
            cli.checks
        },
        baseline_dir: cli.baseline_dir,
        update_baselines: cli.update_baselines,
        check_timeout_ms: cli.timeout_ms,
        sequential: cli.sequential,
    };

    let harness = HarnessConfig::default();
    let report = run_checks(move || StaticSurface::new(harness.clone()), &config);

    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("failed to serialize report: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_report(&report);
    }

    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_report(report: &RunReport) {
    for check in &report.reports {
        match &check.outcome {
            Outcome::Passed { notes } => {
                println!("PASS  {} ({}ms)", check.check, check.duration_ms);
                for note in notes {
                    println!("      note: {note}");
                }
            }
            Outcome::Failed { mismatches } => {
                println!(
                    "FAIL  {} ({} mismatch(es), {}ms)",
                    check.check,
                    mismatches.len(),
                    check.duration_ms
                );
                for m in mismatches {
                    println!("      {}: expected {}, got {}", m.fact, m.expected, m.actual);
                }
            }
            Outcome::Errored { message } => {
                println!("ERROR {} ({}ms)", check.check, check.duration_ms);
                println!("      {message}");
            }
        }
    }
    println!(
        "{} passed, {} failed, {} errored",
        report.passed, report.failed, report.errored
    );
}

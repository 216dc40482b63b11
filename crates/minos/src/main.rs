//! Minos - judge a single submission from the command line
//!
//! Compiles the submission, runs it against every `*.in`/`*.out` pair in the
//! task directory and prints the per-case verdicts and the final score.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use minos::config::Config;
use minos::judge::{Judge, Submission, VerificationStrategy};
use minos::verdict::ScoreReport;
use minos::{metrics, testcase};

#[derive(Parser, Debug)]
#[command(name = "minos", version, about = "Judge a C++ submission against a task directory")]
struct Args {
    /// Submission source file
    source: PathBuf,

    /// Directory holding the numbered `.in` / `.out` files
    task_dir: PathBuf,

    /// Special judge source (testlib-style checker)
    #[arg(long, conflicts_with = "special_judge")]
    checker: Option<PathBuf>,

    /// Use `<TASK_DIR>/checker.cpp` as the special judge
    #[arg(long)]
    special_judge: bool,

    /// Per-case weights in case order, e.g. `1,2,3` (missing entries weigh 1)
    #[arg(long, value_delimiter = ',')]
    weights: Vec<u32>,

    /// Points for a perfect run
    #[arg(long)]
    total_points: Option<u64>,

    /// CPU time limit per case in milliseconds
    #[arg(long)]
    time_limit_ms: Option<u64>,

    /// Memory limit per case in megabytes
    #[arg(long)]
    memory_limit_mb: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr, stdout carries the report
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "minos=info,sisyphus=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = Config::from_env();
    if let Some(points) = args.total_points {
        config.total_points = points;
    }
    if let Some(ms) = args.time_limit_ms {
        config.limits.time_limit_ms = ms;
    }
    if let Some(mb) = args.memory_limit_mb {
        config.limits.memory_limit_mb = mb;
    }
    tracing::info!(
        environment = %config.environment,
        time_limit_ms = config.limits.time_limit_ms,
        memory_limit_mb = config.limits.memory_limit_mb,
        "Starting Minos"
    );

    metrics::init_metrics().context("failed to register metrics")?;

    let cases = testcase::discover(&args.task_dir, &args.weights)?;
    if cases.is_empty() {
        bail!(
            "no test cases in {} (expected numbered *.in / *.out pairs such as game001.in, game001.out)",
            args.task_dir.display()
        );
    }

    let verification = match (args.checker, args.special_judge) {
        (Some(source), _) => VerificationStrategy::Checker { source },
        (None, true) => VerificationStrategy::Checker {
            source: args.task_dir.join("checker.cpp"),
        },
        (None, false) => VerificationStrategy::Diff,
    };

    let judge = Judge::new(&config);
    let submission = Submission::new(&args.source, verification);
    let outcome = judge.judge(&submission, &cases).await;

    // Metrics are written even for aborted runs
    if let Some(path) = &config.metrics_file {
        if let Err(e) = metrics::write_textfile(path) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to write metrics file");
        }
    }

    let report = outcome?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_text(&report));
    }

    Ok(())
}

fn render_text(report: &ScoreReport) -> String {
    let mut out = String::new();

    if let Some(diagnostics) = &report.compile_error {
        let _ = writeln!(out, "Compilation failed:\n{}\n", diagnostics.trim_end());
    }

    let _ = writeln!(out, "{:<8} {:<6} {:>10} {:>12}", "CASE", "RESULT", "TIME(ms)", "MEMORY(KB)");
    for result in &report.results {
        let _ = writeln!(
            out,
            "{:<8} {:<6} {:>10} {:>12}",
            result.label, result.verdict, result.cpu_time_ms, result.peak_memory_kb
        );
        if let Some(diagnostic) = &result.diagnostic {
            for line in diagnostic.lines() {
                let _ = writeln!(out, "         | {}", line);
            }
        }
    }

    let _ = writeln!(
        out,
        "\nPassed {}/{} cases, max time {} ms, max memory {} KB",
        report.passed_count(),
        report.results.len(),
        report.max_time_ms(),
        report.max_memory_kb()
    );
    if let Some(failure) = report.first_failure() {
        let _ = writeln!(out, "First failure: case {} ({})", failure.label, failure.verdict);
    }
    let _ = writeln!(out, "Score: {}/{}", report.score, report.total_points);
    out
}

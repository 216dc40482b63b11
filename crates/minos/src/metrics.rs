//! Prometheus metrics for Minos
//!
//! There is no HTTP endpoint; the binary dumps the text exposition to a file
//! that a node-exporter textfile collector can pick up.

use std::path::Path;
use std::sync::LazyLock;

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use themis_common::Verdict;

/// Global metrics registry
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// CPU time histogram, by verdict
pub static CPU_TIME: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        "judge_case_cpu_time_seconds",
        "CPU time consumed by submissions per test case",
    )
    .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0]);

    HistogramVec::new(opts, &["verdict"]).expect("Failed to create histogram")
});

/// Peak memory histogram, by verdict
pub static MEMORY_USAGE: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        "judge_case_memory_usage_bytes",
        "Peak resident memory of submissions per test case",
    )
    .buckets(vec![
        1024.0 * 1024.0,          // 1 MB
        16.0 * 1024.0 * 1024.0,   // 16 MB
        64.0 * 1024.0 * 1024.0,   // 64 MB
        128.0 * 1024.0 * 1024.0,  // 128 MB
        256.0 * 1024.0 * 1024.0,  // 256 MB
        512.0 * 1024.0 * 1024.0,  // 512 MB
        1024.0 * 1024.0 * 1024.0, // 1 GB
    ]);

    HistogramVec::new(opts, &["verdict"]).expect("Failed to create histogram")
});

/// Verdict counter by type
pub static VERDICT_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    let opts = Opts::new("judge_verdict_total", "Total verdicts by type");
    IntCounterVec::new(opts, &["verdict"]).expect("Failed to create counter")
});

/// Test cases judged counter
pub static CASES_JUDGED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("judge_cases_judged_total", "Total test cases judged")
        .expect("Failed to create counter")
});

/// Runs completed counter
pub static RUNS_COMPLETED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("judge_runs_completed_total", "Total runs that produced a report")
        .expect("Failed to create counter")
});

/// Runs failed counter
pub static RUNS_FAILED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("judge_runs_failed_total", "Total runs aborted by a judge error")
        .expect("Failed to create counter")
});

/// Register all metrics with [`REGISTRY`].
pub fn init_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(CPU_TIME.clone()))?;
    REGISTRY.register(Box::new(MEMORY_USAGE.clone()))?;
    REGISTRY.register(Box::new(VERDICT_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CASES_JUDGED.clone()))?;
    REGISTRY.register(Box::new(RUNS_COMPLETED.clone()))?;
    REGISTRY.register(Box::new(RUNS_FAILED.clone()))?;
    Ok(())
}

/// Record a verdict
pub fn record_verdict(verdict: Verdict) {
    VERDICT_TOTAL.with_label_values(&[verdict.code()]).inc();
    CASES_JUDGED.inc();
}

/// Record execution metrics
pub fn record_execution(verdict: Verdict, cpu_time_ms: u64, peak_memory_kb: u64) {
    CPU_TIME
        .with_label_values(&[verdict.code()])
        .observe(cpu_time_ms as f64 / 1000.0);
    MEMORY_USAGE
        .with_label_values(&[verdict.code()])
        .observe(peak_memory_kb.saturating_mul(1024) as f64);
}

/// Text exposition of everything in [`REGISTRY`].
pub fn render() -> prometheus::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// Write the exposition to `path`, replacing it atomically.
pub fn write_textfile(path: &Path) -> anyhow::Result<()> {
    let body = render()?;
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    std::io::Write::write_all(&mut tmp, body.as_bytes())?;
    tmp.persist(path)?;
    Ok(())
}

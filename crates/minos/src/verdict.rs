//! Per-case results and score accumulation

use chrono::{DateTime, Utc};
use serde::Serialize;
use themis_common::{TestCase, Verdict};

/// Result of judging a single test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestCaseResult {
    /// Label of the case (display only)
    pub label: String,

    /// Verdict for this test case
    pub verdict: Verdict,

    /// CPU time in milliseconds
    pub cpu_time_ms: u64,

    /// Peak memory usage in KB
    pub peak_memory_kb: u64,

    /// Weight the case carries in the score
    pub weight: u32,

    /// Child stderr excerpt, checker comment or judge-side explanation
    pub diagnostic: Option<String>,
}

impl TestCaseResult {
    /// Create a result for a case that ran
    pub fn new(case: &TestCase, verdict: Verdict, cpu_time_ms: u64, peak_memory_kb: u64) -> Self {
        Self {
            label: case.label.clone(),
            verdict,
            cpu_time_ms,
            peak_memory_kb,
            weight: case.weight,
            diagnostic: None,
        }
    }

    /// Create a compile error result (the case never ran)
    pub fn compile_error(case: &TestCase) -> Self {
        Self::new(case, Verdict::CompileError, 0, 0)
    }

    pub fn with_diagnostic(mut self, diagnostic: Option<String>) -> Self {
        self.diagnostic = diagnostic;
        self
    }
}

/// Accumulates case results for one run.
///
/// Owned by a single run and moved into the final [`ScoreReport`].
#[derive(Debug, Clone)]
pub struct ScoreSheet {
    total_points: u64,
    results: Vec<TestCaseResult>,
}

impl ScoreSheet {
    pub fn new(total_points: u64) -> Self {
        Self {
            total_points,
            results: Vec::new(),
        }
    }

    /// Record one case, in display order.
    pub fn record(&mut self, result: TestCaseResult) {
        self.results.push(result);
    }

    /// Close the sheet and compute the score.
    pub fn finish(self) -> ScoreReport {
        ScoreReport::from_results(self.results, self.total_points, None)
    }

    /// Report for a submission that did not compile: every case is
    /// `CompileError` and nothing is earned.
    pub fn compile_failed(total_points: u64, cases: &[TestCase], diagnostics: String) -> ScoreReport {
        let results = cases.iter().map(TestCaseResult::compile_error).collect();
        ScoreReport::from_results(results, total_points, Some(diagnostics))
    }
}

/// Aggregated result for an entire run
#[derive(Debug, Clone, Serialize)]
pub struct ScoreReport {
    /// When the report was produced
    pub judged_at: DateTime<Utc>,

    /// Results for each test case, in input order
    pub results: Vec<TestCaseResult>,

    /// Points awarded for a perfect run
    pub total_points: u64,

    /// Sum of all case weights (after the all-zero fallback)
    pub total_weight: u64,

    /// Sum of weights of accepted cases
    pub achieved_weight: u64,

    /// Integer score out of `total_points`
    pub score: u64,

    /// Toolchain output when the submission failed to compile
    pub compile_error: Option<String>,
}

impl ScoreReport {
    fn from_results(
        results: Vec<TestCaseResult>,
        total_points: u64,
        compile_error: Option<String>,
    ) -> Self {
        // All-zero weights fall back to one point per case
        let uniform = results.iter().all(|r| r.weight == 0);
        let weight_of = |r: &TestCaseResult| if uniform { 1 } else { u64::from(r.weight) };

        let total_weight: u64 = results.iter().map(weight_of).sum();
        let achieved_weight: u64 = results
            .iter()
            .filter(|r| r.verdict.is_accepted())
            .map(weight_of)
            .sum();

        Self {
            judged_at: Utc::now(),
            score: compute_score(total_points, achieved_weight, total_weight),
            results,
            total_points,
            total_weight,
            achieved_weight,
            compile_error,
        }
    }

    /// Number of accepted cases
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.verdict.is_accepted()).count()
    }

    /// Maximum CPU time across all cases (ms)
    pub fn max_time_ms(&self) -> u64 {
        self.results.iter().map(|r| r.cpu_time_ms).max().unwrap_or(0)
    }

    /// Maximum peak memory across all cases (KB)
    pub fn max_memory_kb(&self) -> u64 {
        self.results.iter().map(|r| r.peak_memory_kb).max().unwrap_or(0)
    }

    /// First case that was not accepted, if any
    pub fn first_failure(&self) -> Option<&TestCaseResult> {
        self.results.iter().find(|r| !r.verdict.is_accepted())
    }
}

/// `floor(total_points * achieved / total)`, zero when nothing is weighted.
pub fn compute_score(total_points: u64, achieved_weight: u64, total_weight: u64) -> u64 {
    if total_weight == 0 {
        return 0;
    }
    let achieved = achieved_weight.min(total_weight);
    let score = u128::from(total_points) * u128::from(achieved) / u128::from(total_weight);
    // score <= total_points, so it always fits back
    score as u64
}

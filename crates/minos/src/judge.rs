//! Judging orchestrator
//!
//! Drives one run: compile the submission (and checker), execute every case
//! in order, verify clean runs and fold the verdicts into a score.

use std::path::{Path, PathBuf};

use sisyphus::{CompileError, Compiler};
use themis_common::{JudgeError, JudgeLimits, JudgeResult, TestCase, Verdict};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::Config;
use crate::executor::Sandbox;
use crate::metrics;
use crate::verdict::{ScoreReport, ScoreSheet, TestCaseResult};
use crate::verifier::{CheckerProgram, Verifier};

/// How produced output is checked for this submission.
#[derive(Debug, Clone)]
pub enum VerificationStrategy {
    /// Built-in whitespace-tolerant comparison
    Diff,
    /// Special judge compiled from this source
    Checker { source: PathBuf },
}

/// A program to judge.
#[derive(Debug, Clone)]
pub struct Submission {
    pub source: PathBuf,
    pub verification: VerificationStrategy,
}

impl Submission {
    pub fn new(source: impl Into<PathBuf>, verification: VerificationStrategy) -> Self {
        Self {
            source: source.into(),
            verification,
        }
    }
}

/// Judge runs submissions against test cases
#[derive(Debug, Clone)]
pub struct Judge {
    compiler: Compiler,
    sandbox: Sandbox,
    limits: JudgeLimits,
    total_points: u64,
    checker_time_limit: std::time::Duration,
    scratch_root: PathBuf,
}

impl Judge {
    pub fn new(config: &Config) -> Self {
        Self {
            compiler: Compiler::new(config.compiler.clone()),
            sandbox: Sandbox::new(config.sandbox.clone()),
            limits: config.limits,
            total_points: config.total_points,
            checker_time_limit: config.checker_time_limit(),
            scratch_root: config.scratch_path.clone(),
        }
    }

    /// Judge `submission` against `cases` and produce its score report.
    ///
    /// Per-case failures become verdicts. Only problems that make the whole
    /// run meaningless (checker does not compile, a program cannot be
    /// spawned, scratch space unavailable) are returned as errors.
    pub async fn judge(&self, submission: &Submission, cases: &[TestCase]) -> JudgeResult<ScoreReport> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("judge", %run_id, cases = cases.len());

        let result = self.judge_inner(submission, cases).instrument(span).await;
        match &result {
            Ok(report) => {
                metrics::RUNS_COMPLETED.inc();
                tracing::info!(
                    %run_id,
                    score = report.score,
                    total_points = report.total_points,
                    passed = report.passed_count(),
                    "Run finished"
                );
            }
            Err(e) => {
                metrics::RUNS_FAILED.inc();
                tracing::error!(%run_id, code = e.error_code(), error = %e, "Run aborted");
            }
        }
        result
    }

    async fn judge_inner(&self, submission: &Submission, cases: &[TestCase]) -> JudgeResult<ScoreReport> {
        std::fs::create_dir_all(&self.scratch_root).map_err(JudgeError::Scratch)?;
        let scratch = tempfile::Builder::new()
            .prefix("themis-")
            .tempdir_in(&self.scratch_root)
            .map_err(JudgeError::Scratch)?;
        tracing::debug!(scratch = %scratch.path().display(), "Scratch directory created");

        let report = self.judge_in(scratch.path(), submission, cases).await;

        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            tracing::warn!(scratch = %scratch_path.display(), error = %e, "Failed to remove scratch directory");
        }
        report
    }

    async fn judge_in(
        &self,
        scratch: &Path,
        submission: &Submission,
        cases: &[TestCase],
    ) -> JudgeResult<ScoreReport> {
        let executable = scratch.join("submission");
        match self.compiler.compile(&submission.source, &executable).await {
            Ok(_) => {}
            Err(CompileError::Spawn { program, source }) => {
                return Err(JudgeError::Spawn {
                    program: program.into(),
                    source,
                });
            }
            Err(e) => {
                tracing::info!(source = %submission.source.display(), "Submission did not compile");
                let diagnostics = e.diagnostics().unwrap_or_else(|| e.to_string());
                for _ in cases {
                    metrics::record_verdict(Verdict::CompileError);
                }
                return Ok(ScoreSheet::compile_failed(self.total_points, cases, diagnostics));
            }
        }

        let verifier = match &submission.verification {
            VerificationStrategy::Diff => Verifier::Diff,
            VerificationStrategy::Checker { source } => {
                let checker = scratch.join("checker");
                match self.compiler.compile_checker(source, &checker).await {
                    Ok(path) => Verifier::Checker(CheckerProgram::new(path, self.checker_time_limit)),
                    Err(CompileError::Spawn { program, source }) => {
                        return Err(JudgeError::Spawn {
                            program: program.into(),
                            source,
                        });
                    }
                    Err(e) => {
                        return Err(JudgeError::CheckerCompile {
                            diagnostics: e.diagnostics().unwrap_or_else(|| e.to_string()),
                        });
                    }
                }
            }
        };

        let mut sheet = ScoreSheet::new(self.total_points);
        for (index, case) in cases.iter().enumerate() {
            let output = scratch.join(format!("output_{:03}.txt", index + 1));
            let result = self.judge_case(&executable, &verifier, case, &output).await;
            let _ = std::fs::remove_file(&output);
            sheet.record(result?);
        }

        Ok(sheet.finish())
    }

    async fn judge_case(
        &self,
        executable: &Path,
        verifier: &Verifier,
        case: &TestCase,
        output: &Path,
    ) -> JudgeResult<TestCaseResult> {
        let execution = self
            .sandbox
            .execute(executable, &case.input_path, output, self.limits)
            .await?;

        let (verdict, diagnostic) = match execution.status.verdict() {
            Some(verdict) => (verdict, execution.diagnostic),
            None => {
                let verification = verifier.verify(case, &execution.output_path).await?;
                (verification.verdict, verification.diagnostic)
            }
        };

        metrics::record_verdict(verdict);
        metrics::record_execution(verdict, execution.cpu_time_ms, execution.peak_memory_kb);
        tracing::info!(
            case = %case.label,
            %verdict,
            cpu_ms = execution.cpu_time_ms,
            memory_kb = execution.peak_memory_kb,
            "Case judged"
        );

        Ok(TestCaseResult::new(case, verdict, execution.cpu_time_ms, execution.peak_memory_kb)
            .with_diagnostic(diagnostic))
    }
}

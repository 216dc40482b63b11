//! Minos - judging engine for Themis
//!
//! Compiles a submission, runs it against every test case under CPU and
//! memory limits, verifies the output and produces a weighted score.

pub mod config;
pub mod executor;
pub mod judge;
pub mod metrics;
pub mod termination;
pub mod testcase;
pub mod verdict;
pub mod verifier;

pub use config::Config;
pub use executor::{ExecutionReport, Sandbox, SandboxConfig, SandboxError};
pub use judge::{Judge, Submission, VerificationStrategy};
pub use termination::{RunStatus, Termination, TerminationClassifier, UnixTermination};
pub use verdict::{ScoreReport, ScoreSheet, TestCaseResult};
pub use verifier::{CheckerProgram, Verification, Verifier};

//! Common types used across the Themis crates.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Terminal outcome of judging one test case.
///
/// Every consumer matches this exhaustively; adding a variant is a breaking
/// change on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// Output verified as correct
    Accepted,
    /// Output does not match the expected answer
    WrongAnswer,
    /// CPU time ceiling hit (OS signal or post-run check)
    TimeLimitExceeded,
    /// Peak resident memory above the limit
    MemoryLimitExceeded,
    /// Crash or non-zero exit
    RuntimeError,
    /// Judge could not decide (unreadable files, checker malfunction, odd signal)
    Unknown,
    /// Submission did not compile; no case was run
    CompileError,
}

impl Verdict {
    /// All variants, in display order.
    pub const ALL: [Verdict; 7] = [
        Verdict::Accepted,
        Verdict::WrongAnswer,
        Verdict::TimeLimitExceeded,
        Verdict::MemoryLimitExceeded,
        Verdict::RuntimeError,
        Verdict::Unknown,
        Verdict::CompileError,
    ];

    /// Get short code for verdict
    pub fn code(&self) -> &'static str {
        match self {
            Verdict::Accepted => "AC",
            Verdict::WrongAnswer => "WA",
            Verdict::TimeLimitExceeded => "TLE",
            Verdict::MemoryLimitExceeded => "MLE",
            Verdict::RuntimeError => "RE",
            Verdict::Unknown => "UKE",
            Verdict::CompileError => "CE",
        }
    }

    /// Only accepted cases contribute weight to the score.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One input / expected-output pair with its scoring weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    /// Display label, usually the number taken from the file name
    pub label: String,
    /// Path to input file
    pub input_path: PathBuf,
    /// Path to expected output file
    pub expected_path: PathBuf,
    /// Relative weight of this case in the final score
    pub weight: u32,
}

impl TestCase {
    pub fn new(
        label: impl Into<String>,
        input_path: impl Into<PathBuf>,
        expected_path: impl Into<PathBuf>,
        weight: u32,
    ) -> Self {
        Self {
            label: label.into(),
            input_path: input_path.into(),
            expected_path: expected_path.into(),
            weight,
        }
    }
}

/// Resource limits applied to every execution of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeLimits {
    /// CPU time limit in milliseconds
    pub time_limit_ms: u64,
    /// Memory limit in megabytes
    pub memory_limit_mb: u64,
}

impl JudgeLimits {
    pub fn new(time_limit_ms: u64, memory_limit_mb: u64) -> Self {
        Self {
            time_limit_ms,
            memory_limit_mb,
        }
    }

    /// CPU ceiling for `RLIMIT_CPU`, whole seconds rounded up (never zero).
    pub fn cpu_limit_secs(&self) -> u64 {
        self.time_limit_ms.div_ceil(1000).max(1)
    }

    /// Memory limit in KiB, the unit `ru_maxrss` is reported in.
    pub fn memory_limit_kb(&self) -> u64 {
        self.memory_limit_mb.saturating_mul(1024)
    }

    /// Memory limit in bytes, for `RLIMIT_AS`.
    pub fn memory_limit_bytes(&self) -> u64 {
        self.memory_limit_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for JudgeLimits {
    fn default() -> Self {
        JudgeLimits {
            time_limit_ms: 1000,
            memory_limit_mb: 512,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_codes_are_unique() {
        let mut codes: Vec<_> = Verdict::ALL.iter().map(Verdict::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), Verdict::ALL.len());
    }

    #[test]
    fn test_verdict_serde_names() {
        let json = serde_json::to_string(&Verdict::TimeLimitExceeded).unwrap();
        assert_eq!(json, "\"TIME_LIMIT_EXCEEDED\"");
        let back: Verdict = serde_json::from_str("\"COMPILE_ERROR\"").unwrap();
        assert_eq!(back, Verdict::CompileError);
    }

    #[test]
    fn test_only_accepted_scores() {
        for verdict in Verdict::ALL {
            assert_eq!(verdict.is_accepted(), verdict == Verdict::Accepted);
        }
    }

    #[test]
    fn test_cpu_limit_rounds_up() {
        assert_eq!(JudgeLimits::new(1000, 256).cpu_limit_secs(), 1);
        assert_eq!(JudgeLimits::new(1001, 256).cpu_limit_secs(), 2);
        assert_eq!(JudgeLimits::new(2500, 256).cpu_limit_secs(), 3);
        assert_eq!(JudgeLimits::new(0, 256).cpu_limit_secs(), 1);
    }

    #[test]
    fn test_memory_units() {
        let limits = JudgeLimits::new(1000, 256);
        assert_eq!(limits.memory_limit_kb(), 256 * 1024);
        assert_eq!(limits.memory_limit_bytes(), 256 * 1024 * 1024);
    }
}

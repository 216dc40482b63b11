//! Classification of how a sandboxed child ended.
//!
//! Decoding the raw wait status is platform glue and lives behind
//! [`TerminationClassifier`]. Turning a decoded [`Termination`] plus the
//! kernel's resource accounting into a [`RunStatus`] is the portable part
//! and lives in [`classify`].

use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;
use serde::Serialize;
use themis_common::{JudgeLimits, Verdict};

/// Platform-independent description of a child's end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Exited normally with this status
    Exited(i32),
    /// Killed by a CPU-limit or alarm signal
    CpuLimitSignal(i32),
    /// Killed by a crash signal (segmentation violation, abort)
    CrashSignal(i32),
    /// Killed by any other signal
    OtherSignal(i32),
    /// Status word could not be decoded
    Unrecognized(i32),
}

impl Termination {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Termination::Exited(code) => Some(*code),
            _ => None,
        }
    }

    pub fn signal(&self) -> Option<i32> {
        match self {
            Termination::CpuLimitSignal(sig)
            | Termination::CrashSignal(sig)
            | Termination::OtherSignal(sig) => Some(*sig),
            Termination::Exited(_) | Termination::Unrecognized(_) => None,
        }
    }
}

/// Decodes a raw wait status for the current platform.
pub trait TerminationClassifier: Send + Sync {
    fn classify_termination(&self, raw_status: i32) -> Termination;
}

/// `waitpid`-style status decoding via `nix`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnixTermination;

impl TerminationClassifier for UnixTermination {
    fn classify_termination(&self, raw_status: i32) -> Termination {
        // The pid is only carried along by nix, it plays no part in decoding
        match WaitStatus::from_raw(Pid::from_raw(0), raw_status) {
            Ok(WaitStatus::Exited(_, code)) => Termination::Exited(code),
            Ok(WaitStatus::Signaled(_, signal, _)) => match signal {
                Signal::SIGXCPU | Signal::SIGALRM => Termination::CpuLimitSignal(signal as i32),
                Signal::SIGSEGV | Signal::SIGABRT => Termination::CrashSignal(signal as i32),
                other => Termination::OtherSignal(other as i32),
            },
            _ => Termination::Unrecognized(raw_status),
        }
    }
}

/// Kernel accounting for one finished child.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResourceUsage {
    /// User + system CPU time in milliseconds
    pub cpu_time_ms: u64,
    /// Peak resident set size in KiB
    pub peak_memory_kb: u64,
}

impl ResourceUsage {
    pub fn from_rusage(usage: &libc::rusage) -> Self {
        let secs = usage.ru_utime.tv_sec as i64 + usage.ru_stime.tv_sec as i64;
        let micros = usage.ru_utime.tv_usec as i64 + usage.ru_stime.tv_usec as i64;
        let cpu_ms = secs * 1000 + micros / 1000;

        Self {
            cpu_time_ms: cpu_ms.max(0) as u64,
            // ru_maxrss is reported in KiB on Linux
            peak_memory_kb: (usage.ru_maxrss as i64).max(0) as u64,
        }
    }
}

/// Executor-level outcome, before output verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Clean exit within limits; the verifier decides the verdict
    Success,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    RuntimeError,
    Unknown,
}

impl RunStatus {
    /// Final verdict for this status, or `None` when output still needs verifying.
    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            RunStatus::Success => None,
            RunStatus::TimeLimitExceeded => Some(Verdict::TimeLimitExceeded),
            RunStatus::MemoryLimitExceeded => Some(Verdict::MemoryLimitExceeded),
            RunStatus::RuntimeError => Some(Verdict::RuntimeError),
            RunStatus::Unknown => Some(Verdict::Unknown),
        }
    }
}

/// Apply the judging decision table.
///
/// The OS ceilings are coarse (whole CPU seconds), so a clean exit is still
/// checked against the exact limits: time first, then memory.
pub fn classify(termination: &Termination, usage: &ResourceUsage, limits: &JudgeLimits) -> RunStatus {
    match termination {
        Termination::Exited(0) => {
            if usage.cpu_time_ms > limits.time_limit_ms {
                RunStatus::TimeLimitExceeded
            } else if usage.peak_memory_kb > limits.memory_limit_kb() {
                RunStatus::MemoryLimitExceeded
            } else {
                RunStatus::Success
            }
        }
        Termination::Exited(_) => RunStatus::RuntimeError,
        Termination::CpuLimitSignal(_) => RunStatus::TimeLimitExceeded,
        Termination::CrashSignal(_) => RunStatus::RuntimeError,
        Termination::OtherSignal(_) | Termination::Unrecognized(_) => RunStatus::Unknown,
    }
}

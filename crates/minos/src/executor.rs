//! Sandboxed executor for user submissions
//!
//! One call runs one child. Limits are applied inside the child between
//! `fork` and `exec`, so user code never runs unconstrained:
//!
//! - `RLIMIT_CPU`: the time limit rounded up to whole seconds (soft), one
//!   more second hard, so SIGXCPU arrives before the kernel's SIGKILL
//! - `RLIMIT_AS`: the memory limit plus a configurable headroom, so an
//!   oversized allocation succeeds and shows up as resident memory instead
//!   of an allocator failure
//! - `RLIMIT_CORE`: zero, CPU-limit kills must not litter the scratch dir
//!
//! While the child runs, a watchdog thread polls its peak RSS (and, when
//! configured, the wall clock) and SIGKILLs it past the limit. The parent
//! blocks in `wait4` and takes CPU time and peak RSS from the kernel's
//! `rusage`, never from a wall clock.

use std::fs::File;
use std::io::{self, Read};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use nix::sys::resource::{setrlimit, Resource};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use serde::Serialize;
use thiserror::Error;
use themis_common::{JudgeError, JudgeLimits};

use crate::termination::{
    classify, ResourceUsage, RunStatus, Termination, TerminationClassifier, UnixTermination,
};

/// Exit status used by the child when its limits could not be applied.
pub const LIMIT_SETUP_FAILURE_EXIT: i32 = 121;

/// Errors that make execution impossible (as opposed to a failing submission).
#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to prepare {path}: {source}")]
    Redirect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to wait for pid {pid}: {source}")]
    Wait {
        pid: i32,
        #[source]
        source: io::Error,
    },

    #[error("Sandbox task failed: {0}")]
    Join(String),
}

impl From<SandboxError> for JudgeError {
    fn from(err: SandboxError) -> Self {
        match err {
            SandboxError::Spawn { program, source } => JudgeError::Spawn { program, source },
            SandboxError::Redirect { path, source } => {
                JudgeError::io(format!("redirecting to {}", path.display()), source)
            }
            SandboxError::Wait { pid, source } => {
                JudgeError::io(format!("waiting for pid {}", pid), source)
            }
            SandboxError::Join(message) => JudgeError::Internal(message),
        }
    }
}

/// Executor settings that are not per-run limits.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Kill children that outlive this wall-clock limit (off when `None`)
    pub wall_time_limit: Option<Duration>,
    /// Bytes of child stderr kept for diagnostics
    pub stderr_excerpt_bytes: usize,
    /// Address space granted above the memory limit, in megabytes
    pub address_space_headroom_mb: u64,
    /// How often the watchdog samples the child
    pub poll_interval: Duration,
}

impl SandboxConfig {
    /// `RLIMIT_AS` value for `limits`.
    pub fn address_space_bytes(&self, limits: &JudgeLimits) -> u64 {
        limits
            .memory_limit_bytes()
            .saturating_add(self.address_space_headroom_mb.saturating_mul(1024 * 1024))
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            wall_time_limit: None,
            stderr_excerpt_bytes: 500,
            address_space_headroom_mb: 2048,
            poll_interval: Duration::from_millis(10),
        }
    }
}

/// Result of one sandboxed execution.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    /// Outcome before verification
    pub status: RunStatus,
    /// User + system CPU time in milliseconds
    pub cpu_time_ms: u64,
    /// Peak resident memory in KiB
    pub peak_memory_kb: u64,
    /// Where the child's stdout was written
    pub output_path: PathBuf,
    /// Exit code (if the child exited normally)
    pub exit_code: Option<i32>,
    /// Terminating signal (if any)
    pub signal: Option<i32>,
    /// Head of the child's stderr, or a judge-side explanation
    pub diagnostic: Option<String>,
}

impl ExecutionReport {
    fn unknown(output_path: &Path, diagnostic: String) -> Self {
        Self {
            status: RunStatus::Unknown,
            cpu_time_ms: 0,
            peak_memory_kb: 0,
            output_path: output_path.to_path_buf(),
            exit_code: None,
            signal: None,
            diagnostic: Some(diagnostic),
        }
    }
}

/// Runs one artifact per call under CPU and memory ceilings.
#[derive(Clone)]
pub struct Sandbox {
    config: SandboxConfig,
    classifier: Arc<dyn TerminationClassifier>,
}

impl std::fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sandbox").field("config", &self.config).finish()
    }
}

impl Sandbox {
    /// Create a sandbox using the platform's wait-status decoding.
    pub fn new(config: SandboxConfig) -> Self {
        Self::with_classifier(config, Arc::new(UnixTermination))
    }

    pub fn with_classifier(config: SandboxConfig, classifier: Arc<dyn TerminationClassifier>) -> Self {
        Self { config, classifier }
    }

    /// Execute `executable` on the blocking pool.
    ///
    /// stdin comes from `input`, stdout goes to `output`, stderr goes to a
    /// sibling `.stderr` file next to `output`.
    pub async fn execute(
        &self,
        executable: &Path,
        input: &Path,
        output: &Path,
        limits: JudgeLimits,
    ) -> Result<ExecutionReport, SandboxError> {
        let sandbox = self.clone();
        let executable = executable.to_path_buf();
        let input = input.to_path_buf();
        let output = output.to_path_buf();

        tokio::task::spawn_blocking(move || sandbox.run(&executable, &input, &output, &limits))
            .await
            .map_err(|e| SandboxError::Join(e.to_string()))?
    }

    /// Blocking variant of [`Sandbox::execute`].
    pub fn run(
        &self,
        executable: &Path,
        input: &Path,
        output: &Path,
        limits: &JudgeLimits,
    ) -> Result<ExecutionReport, SandboxError> {
        let stdin = match File::open(input) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(input = %input.display(), error = %e, "Input file unreadable");
                return Ok(ExecutionReport::unknown(
                    output,
                    format!("cannot open input {}: {}", input.display(), e),
                ));
            }
        };
        let stdout = File::create(output).map_err(|source| SandboxError::Redirect {
            path: output.to_path_buf(),
            source,
        })?;
        let stderr_path = stderr_path_for(output);
        let stderr = File::create(&stderr_path).map_err(|source| SandboxError::Redirect {
            path: stderr_path.clone(),
            source,
        })?;

        let cpu_secs = limits.cpu_limit_secs();
        let address_space = self.config.address_space_bytes(limits);

        let mut command = Command::new(executable);
        command.stdin(stdin).stdout(stdout).stderr(stderr);

        // SAFETY: the hook runs between fork and exec and only calls
        // setrlimit and _exit, both async-signal-safe.
        unsafe {
            command.pre_exec(move || {
                if apply_limits(cpu_secs, address_space).is_err() {
                    libc::_exit(LIMIT_SETUP_FAILURE_EXIT);
                }
                Ok(())
            });
        }

        let child = command.spawn().map_err(|source| SandboxError::Spawn {
            program: executable.to_path_buf(),
            source,
        })?;
        drop(command);
        let pid = child.id() as i32;

        tracing::debug!(
            pid,
            executable = %executable.display(),
            cpu_secs,
            memory_mb = limits.memory_limit_mb,
            "Child started"
        );

        let watchdog = Watchdog::arm(
            pid,
            self.config.wall_time_limit,
            limits.memory_limit_kb(),
            self.config.poll_interval,
        );
        let exited = wait_exited(pid);
        let trip = watchdog.disarm();
        if let Err(source) = exited {
            let _ = kill(Pid::from_raw(pid), Signal::SIGKILL);
            let _ = wait_with_usage(pid);
            return Err(SandboxError::Wait { pid, source });
        }

        let (raw_status, rusage) =
            wait_with_usage(pid).map_err(|source| SandboxError::Wait { pid, source })?;
        // Already reaped by wait4; std's handle never waits on drop
        drop(child);

        let usage = ResourceUsage::from_rusage(&rusage);
        let termination = self.classifier.classify_termination(raw_status);
        let status = settle(trip, &termination, &usage, limits);
        if let Some(trip) = trip {
            tracing::info!(pid, ?trip, ?status, "Watchdog fired");
        }

        let diagnostic = match status {
            RunStatus::RuntimeError | RunStatus::Unknown => {
                read_excerpt(&stderr_path, self.config.stderr_excerpt_bytes)
            }
            RunStatus::Success | RunStatus::TimeLimitExceeded | RunStatus::MemoryLimitExceeded => {
                None
            }
        };
        let _ = std::fs::remove_file(&stderr_path);

        tracing::debug!(
            pid,
            ?termination,
            ?status,
            cpu_ms = usage.cpu_time_ms,
            memory_kb = usage.peak_memory_kb,
            "Child finished"
        );

        Ok(ExecutionReport {
            status,
            cpu_time_ms: usage.cpu_time_ms,
            peak_memory_kb: usage.peak_memory_kb,
            output_path: output.to_path_buf(),
            exit_code: termination.exit_code(),
            signal: termination.signal(),
            diagnostic,
        })
    }
}

fn stderr_path_for(output: &Path) -> PathBuf {
    output.with_extension("stderr")
}

fn apply_limits(cpu_secs: u64, address_space: u64) -> nix::Result<()> {
    setrlimit(Resource::RLIMIT_CORE, 0, 0)?;
    setrlimit(Resource::RLIMIT_CPU, cpu_secs, cpu_secs.saturating_add(1))?;
    setrlimit(Resource::RLIMIT_AS, address_space, address_space)?;
    Ok(())
}

/// Block until `pid` has exited without reaping it.
fn wait_exited(pid: i32) -> io::Result<()> {
    // SAFETY: siginfo_t is plain old data
    let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
    loop {
        // SAFETY: pid is our own unreaped child and info is a valid out-pointer
        let rc = unsafe {
            libc::waitid(
                libc::P_PID,
                pid as libc::id_t,
                &mut info,
                libc::WEXITED | libc::WNOWAIT,
            )
        };
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// Reap `pid` and collect its resource usage.
fn wait_with_usage(pid: i32) -> io::Result<(i32, libc::rusage)> {
    let mut status: libc::c_int = 0;
    // SAFETY: rusage is plain old data
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    loop {
        // SAFETY: pid is our own child; status and usage are valid out-pointers
        let rc = unsafe { libc::wait4(pid, &mut status, 0, &mut usage) };
        if rc == pid {
            return Ok((status, usage));
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

fn read_excerpt(path: &Path, limit: usize) -> Option<String> {
    let file = File::open(path).ok()?;
    let mut buf = Vec::new();
    file.take(limit as u64).read_to_end(&mut buf).ok()?;
    let text = String::from_utf8_lossy(&buf).trim_end().to_string();
    if text.is_empty() { None } else { Some(text) }
}

/// Resolve a watchdog trip against how the child actually ended.
///
/// A trip only counts when the child died of SIGKILL. A child that finished
/// on its own just before the kill landed is classified normally.
fn settle(
    trip: Option<Trip>,
    termination: &Termination,
    usage: &ResourceUsage,
    limits: &JudgeLimits,
) -> RunStatus {
    let killed = termination.signal() == Some(Signal::SIGKILL as i32);
    match trip {
        Some(Trip::Memory) if killed => RunStatus::MemoryLimitExceeded,
        Some(Trip::WallClock) if killed => RunStatus::TimeLimitExceeded,
        _ => classify(termination, usage, limits),
    }
}

/// Peak resident set size (`VmHWM`) of a live process, in KiB.
fn peak_rss_kb(pid: i32) -> Option<u64> {
    let status = std::fs::read_to_string(format!("/proc/{}/status", pid)).ok()?;
    status
        .lines()
        .find_map(|line| line.strip_prefix("VmHWM:"))
        .and_then(|rest| rest.trim().trim_end_matches("kB").trim().parse().ok())
}

/// Why the watchdog killed a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trip {
    WallClock,
    Memory,
}

/// Samples a running child and kills it past its memory or wall-clock limit.
///
/// The child is only signalled while it is still unreaped, so its pid cannot
/// have been recycled.
struct Watchdog {
    cancel: mpsc::Sender<()>,
    handle: JoinHandle<Option<Trip>>,
}

impl Watchdog {
    fn arm(pid: i32, wall_limit: Option<Duration>, memory_limit_kb: u64, poll: Duration) -> Self {
        let (cancel, cancelled) = mpsc::channel::<()>();
        let started = Instant::now();
        let handle = thread::spawn(move || loop {
            match cancelled.recv_timeout(poll) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => return None,
            }

            let trip = if peak_rss_kb(pid).is_some_and(|kb| kb > memory_limit_kb) {
                Some(Trip::Memory)
            } else if wall_limit.is_some_and(|limit| started.elapsed() >= limit) {
                Some(Trip::WallClock)
            } else {
                None
            };

            if let Some(trip) = trip {
                let _ = kill(Pid::from_raw(pid), Signal::SIGKILL);
                return Some(trip);
            }
        });

        Self { cancel, handle }
    }

    /// Stop the watchdog; returns why it fired, if it did.
    fn disarm(self) -> Option<Trip> {
        let _ = self.cancel.send(());
        self.handle.join().unwrap_or(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn input(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("case.in");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn limits() -> JudgeLimits {
        JudgeLimits::new(1000, 256)
    }

    #[test]
    fn test_clean_run_redirects_io() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "echo", "cat");
        let input = input(dir.path(), "1 2 3\n");
        let output = dir.path().join("out.txt");

        let report = Sandbox::new(SandboxConfig::default())
            .run(&program, &input, &output, &limits())
            .unwrap();

        assert_eq!(report.status, RunStatus::Success);
        assert_eq!(report.exit_code, Some(0));
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "1 2 3\n");
        assert!(report.peak_memory_kb > 0);
        assert!(!stderr_path_for(&output).exists());
    }

    #[test]
    fn test_nonzero_exit_keeps_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "fail", "echo 'boom' >&2\nexit 3");
        let input = input(dir.path(), "");
        let output = dir.path().join("out.txt");

        let report = Sandbox::new(SandboxConfig::default())
            .run(&program, &input, &output, &limits())
            .unwrap();

        assert_eq!(report.status, RunStatus::RuntimeError);
        assert_eq!(report.exit_code, Some(3));
        assert_eq!(report.diagnostic.as_deref(), Some("boom"));
    }

    #[test]
    fn test_segfault_is_runtime_error() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "segv", "kill -s SEGV $$");
        let input = input(dir.path(), "");
        let output = dir.path().join("out.txt");

        let report = Sandbox::new(SandboxConfig::default())
            .run(&program, &input, &output, &limits())
            .unwrap();

        assert_eq!(report.status, RunStatus::RuntimeError);
        assert_eq!(report.signal, Some(Signal::SIGSEGV as i32));
    }

    #[test]
    fn test_unexpected_signal_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "usr1", "kill -s USR1 $$");
        let input = input(dir.path(), "");
        let output = dir.path().join("out.txt");

        let report = Sandbox::new(SandboxConfig::default())
            .run(&program, &input, &output, &limits())
            .unwrap();

        assert_eq!(report.status, RunStatus::Unknown);
    }

    #[test]
    fn test_cpu_loop_hits_time_limit() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "spin", "while :; do :; done");
        let input = input(dir.path(), "");
        let output = dir.path().join("out.txt");

        let report = Sandbox::new(SandboxConfig::default())
            .run(&program, &input, &output, &limits())
            .unwrap();

        assert_eq!(report.status, RunStatus::TimeLimitExceeded);
        assert_eq!(report.signal, Some(Signal::SIGXCPU as i32));
        assert!(report.cpu_time_ms >= 900);
    }

    #[test]
    fn test_watchdog_stops_sleeping_child() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "nap", "exec sleep 5");
        let input = input(dir.path(), "");
        let output = dir.path().join("out.txt");
        let config = SandboxConfig {
            wall_time_limit: Some(Duration::from_millis(300)),
            ..SandboxConfig::default()
        };

        let started = Instant::now();
        let report = Sandbox::new(config)
            .run(&program, &input, &output, &limits())
            .unwrap();

        assert_eq!(report.status, RunStatus::TimeLimitExceeded);
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_watchdog_leaves_fast_child_alone() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "quick", "echo done");
        let input = input(dir.path(), "");
        let output = dir.path().join("out.txt");
        let config = SandboxConfig {
            wall_time_limit: Some(Duration::from_secs(5)),
            ..SandboxConfig::default()
        };

        let report = Sandbox::new(config)
            .run(&program, &input, &output, &limits())
            .unwrap();

        assert_eq!(report.status, RunStatus::Success);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "done\n");
    }

    #[test]
    fn test_missing_input_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "echo", "cat");
        let output = dir.path().join("out.txt");

        let report = Sandbox::new(SandboxConfig::default())
            .run(&program, &dir.path().join("missing.in"), &output, &limits())
            .unwrap();

        assert_eq!(report.status, RunStatus::Unknown);
        assert!(report.diagnostic.unwrap().contains("missing.in"));
    }

    #[test]
    fn test_missing_executable_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let input = input(dir.path(), "");
        let output = dir.path().join("out.txt");

        let err = Sandbox::new(SandboxConfig::default())
            .run(&dir.path().join("nope"), &input, &output, &limits())
            .unwrap_err();

        assert!(matches!(err, SandboxError::Spawn { .. }));
        assert!(matches!(JudgeError::from(err), JudgeError::Spawn { .. }));
    }

    #[test]
    fn test_repeated_runs_agree() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "sum", "read a b\necho $((a + b))");
        let input = input(dir.path(), "2 40\n");
        let sandbox = Sandbox::new(SandboxConfig::default());

        let first = sandbox
            .run(&program, &input, &dir.path().join("a.txt"), &limits())
            .unwrap();
        let second = sandbox
            .run(&program, &input, &dir.path().join("b.txt"), &limits())
            .unwrap();

        assert_eq!(first.status, second.status);
        assert_eq!(
            std::fs::read(&first.output_path).unwrap(),
            std::fs::read(&second.output_path).unwrap()
        );
    }

    #[test]
    fn test_allocation_over_limit_is_memory_limit_exceeded() {
        let dir = tempfile::tempdir().unwrap();
        // Buffers the last 1 GiB of an endless stream, so resident memory keeps growing
        let program = script(dir.path(), "hog", "exec tail -c 1073741824");
        let output = dir.path().join("out.txt");
        let limits = JudgeLimits::new(5000, 256);

        let report = Sandbox::new(SandboxConfig::default())
            .run(&program, Path::new("/dev/zero"), &output, &limits)
            .unwrap();

        assert_eq!(report.status, RunStatus::MemoryLimitExceeded);
        assert!(report.peak_memory_kb > limits.memory_limit_kb());
    }

    #[test]
    fn test_address_space_has_headroom() {
        let limits = JudgeLimits::new(1000, 256);
        let config = SandboxConfig::default();
        assert_eq!(
            config.address_space_bytes(&limits),
            (256 + 2048) * 1024 * 1024
        );

        let tight = SandboxConfig {
            address_space_headroom_mb: 0,
            ..SandboxConfig::default()
        };
        assert_eq!(tight.address_space_bytes(&limits), limits.memory_limit_bytes());
    }

    #[test]
    fn test_trip_only_counts_for_killed_child() {
        let limits = limits();
        let usage = ResourceUsage {
            cpu_time_ms: 10,
            peak_memory_kb: 1024,
        };
        let killed = Termination::OtherSignal(Signal::SIGKILL as i32);

        assert_eq!(
            settle(Some(Trip::Memory), &killed, &usage, &limits),
            RunStatus::MemoryLimitExceeded
        );
        assert_eq!(
            settle(Some(Trip::WallClock), &killed, &usage, &limits),
            RunStatus::TimeLimitExceeded
        );
        // Child exited cleanly just before the kill landed
        assert_eq!(
            settle(Some(Trip::WallClock), &Termination::Exited(0), &usage, &limits),
            RunStatus::Success
        );
        assert_eq!(
            settle(Some(Trip::Memory), &Termination::Exited(2), &usage, &limits),
            RunStatus::RuntimeError
        );
        assert_eq!(settle(None, &killed, &usage, &limits), RunStatus::Unknown);
    }

    #[test]
    fn test_peak_rss_of_live_process() {
        let own = peak_rss_kb(std::process::id() as i32);
        assert!(own.is_some_and(|kb| kb > 0));
        assert_eq!(peak_rss_kb(-1), None);
    }

    const LOWERED_CPU_CEILING: &str = "MINOS_TEST_LOWERED_CPU_CEILING";

    #[test]
    fn test_limit_setup_failure_is_runtime_error() {
        // Root may raise hard limits, so the child's setrlimit would succeed
        // SAFETY: geteuid has no preconditions
        if unsafe { libc::geteuid() } == 0 {
            return;
        }

        let mut helper = Command::new(std::env::current_exe().unwrap());
        helper
            .args([
                "--exact",
                "executor::tests::test_child_under_lowered_cpu_ceiling",
                "--test-threads=1",
            ])
            .env(LOWERED_CPU_CEILING, "1");
        // SAFETY: only setrlimit runs between fork and exec
        unsafe {
            helper.pre_exec(|| setrlimit(Resource::RLIMIT_CPU, 2, 2).map_err(io::Error::from));
        }

        let output = helper.output().unwrap();
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(output.status.success(), "{stdout}");
        assert!(stdout.contains("1 passed"), "{stdout}");
    }

    #[test]
    fn test_child_under_lowered_cpu_ceiling() {
        // Only meaningful inside the helper spawned above
        if std::env::var_os(LOWERED_CPU_CEILING).is_none() {
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "echo", "cat");
        let input = input(dir.path(), "1\n");
        let output = dir.path().join("out.txt");

        // Needs a 6 s hard CPU limit, above the inherited 2 s ceiling
        let report = Sandbox::new(SandboxConfig::default())
            .run(&program, &input, &output, &JudgeLimits::new(5000, 256))
            .unwrap();

        assert_eq!(report.status, RunStatus::RuntimeError);
        assert_eq!(report.exit_code, Some(LIMIT_SETUP_FAILURE_EXIT));
    }

    #[tokio::test]
    async fn test_execute_on_blocking_pool() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "echo", "cat");
        let input = input(dir.path(), "hello\n");
        let output = dir.path().join("out.txt");

        let report = Sandbox::new(SandboxConfig::default())
            .execute(&program, &input, &output, limits())
            .await
            .unwrap();

        assert_eq!(report.status, RunStatus::Success);
        assert_eq!(report.output_path, output);
    }
}

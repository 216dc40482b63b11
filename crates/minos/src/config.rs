//! Configuration for the Minos judge

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use themis_common::JudgeLimits;

use crate::executor::SandboxConfig;

/// Minos configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment (development, staging, production)
    pub environment: String,

    /// Points awarded for a perfect run
    pub total_points: u64,

    /// Limits applied to every test case
    pub limits: JudgeLimits,

    /// Executor settings (watchdog, address space headroom, stderr excerpt size)
    pub sandbox: SandboxConfig,

    /// Checker time limit in milliseconds
    pub checker_time_limit_ms: u64,

    /// Directory that holds per-run scratch directories
    pub scratch_path: PathBuf,

    /// Where to write the Prometheus text exposition, if anywhere
    pub metrics_file: Option<PathBuf>,

    /// Toolchain settings for submissions and checkers
    pub compiler: sisyphus::Config,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            total_points: env::var("TOTAL_POINTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.total_points),
            limits: JudgeLimits {
                time_limit_ms: env::var("TIME_LIMIT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.limits.time_limit_ms),
                memory_limit_mb: env::var("MEMORY_LIMIT_MB")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.limits.memory_limit_mb),
            },
            sandbox: SandboxConfig {
                wall_time_limit: env::var("WALL_TIME_LIMIT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .map(Duration::from_millis),
                stderr_excerpt_bytes: env::var("STDERR_EXCERPT_BYTES")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.sandbox.stderr_excerpt_bytes),
                address_space_headroom_mb: env::var("ADDRESS_SPACE_HEADROOM_MB")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.sandbox.address_space_headroom_mb),
                poll_interval: defaults.sandbox.poll_interval,
            },
            checker_time_limit_ms: env::var("CHECKER_TIME_LIMIT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.checker_time_limit_ms),
            scratch_path: env::var("SCRATCH_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_path),
            metrics_file: env::var("METRICS_FILE").ok().map(PathBuf::from),
            compiler: sisyphus::Config::from_env(),
        }
    }

    pub fn checker_time_limit(&self) -> Duration {
        Duration::from_millis(self.checker_time_limit_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            total_points: 100,
            limits: JudgeLimits::default(),
            sandbox: SandboxConfig::default(),
            checker_time_limit_ms: 60_000, // 60 seconds
            scratch_path: env::temp_dir(),
            metrics_file: None,
            compiler: sisyphus::Config::default(),
        }
    }
}

//! Configuration for the Sisyphus compiler adapter.

use std::env;
use std::path::PathBuf;

/// Placeholder replaced by the source file path.
pub const SOURCE_PLACEHOLDER: &str = "{source}";
/// Placeholder replaced by the artifact path.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";
/// Standalone argument expanded to one `-I<dir>` per include directory.
pub const INCLUDES_PLACEHOLDER: &str = "{includes}";

/// External toolchain invocation: a program plus an argument template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    /// Compiler executable (looked up on `PATH`)
    pub program: String,
    /// Arguments, may contain the `{source}`, `{output}` and `{includes}` placeholders
    pub args: Vec<String>,
}

impl Toolchain {
    /// A C++ toolchain in the usual `<cxx> <flags> -I.. -o <output> <source>` shape.
    pub fn cxx(program: impl Into<String>, flags: &str) -> Self {
        let mut args: Vec<String> = flags.split_whitespace().map(str::to_string).collect();
        args.push(INCLUDES_PLACEHOLDER.to_string());
        args.push("-o".to_string());
        args.push(OUTPUT_PLACEHOLDER.to_string());
        args.push(SOURCE_PLACEHOLDER.to_string());

        Self {
            program: program.into(),
            args,
        }
    }
}

impl Default for Toolchain {
    fn default() -> Self {
        Toolchain::cxx("g++", "-std=c++11 -O2")
    }
}

/// Sisyphus configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Toolchain used for submissions and checkers
    pub toolchain: Toolchain,
    /// Compilation timeout in seconds
    pub compile_timeout_secs: u64,
    /// Extra include directories for checker builds (where `testlib.h` lives)
    pub checker_include_dirs: Vec<PathBuf>,
    /// Maximum bytes of toolchain stderr kept as diagnostics
    pub max_diagnostic_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let program = env::var("CXX").unwrap_or_else(|_| "g++".to_string());
        let flags = env::var("CXX_FLAGS").unwrap_or_else(|_| "-std=c++11 -O2".to_string());

        // testlib.h is expected next to the judge binary unless told otherwise
        let checker_include_dirs = env::var("TESTLIB_INCLUDE_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::current_exe()
                    .ok()
                    .and_then(|exe| exe.parent().map(PathBuf::from))
            })
            .into_iter()
            .collect();

        Self {
            toolchain: Toolchain::cxx(program, &flags),
            compile_timeout_secs: env::var("COMPILE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            checker_include_dirs,
            max_diagnostic_bytes: env::var("MAX_DIAGNOSTIC_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(64 * 1024),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            toolchain: Toolchain::default(),
            compile_timeout_secs: 30,
            checker_include_dirs: Vec::new(),
            max_diagnostic_bytes: 64 * 1024,
        }
    }
}

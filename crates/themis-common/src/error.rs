//! Run-level error types.
//!
//! Anything that goes wrong inside a single test case is encoded as a
//! [`Verdict`](crate::Verdict) instead. A `JudgeError` means the whole run
//! could not be judged.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a judging run.
#[derive(Error, Debug)]
pub enum JudgeError {
    /// The special-judge checker did not compile
    #[error("Checker compilation failed:\n{diagnostics}")]
    CheckerCompile { diagnostics: String },

    /// A child process (toolchain, submission or checker) could not be started
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The per-run scratch directory could not be prepared
    #[error("Scratch directory error: {0}")]
    Scratch(#[source] io::Error),

    /// File I/O outside of a single test case
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// Bug or panic inside the judge itself
    #[error("Internal error: {0}")]
    Internal(String),
}

impl JudgeError {
    /// Returns the error code string for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            JudgeError::CheckerCompile { .. } => "CHECKER_COMPILE_ERROR",
            JudgeError::Spawn { .. } => "SPAWN_ERROR",
            JudgeError::Scratch(_) => "SCRATCH_ERROR",
            JudgeError::Io { .. } => "IO_ERROR",
            JudgeError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        JudgeError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type alias using JudgeError
pub type JudgeResult<T> = Result<T, JudgeError>;

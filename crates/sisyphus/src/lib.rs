//! Sisyphus - Compiler adapter for Themis
//!
//! Turns a source file into a runnable artifact with an external toolchain
//! and captures its diagnostics. No retries: a failed build is final.

pub mod compiler;
pub mod config;

pub use compiler::{read_bounded, CompileError, Compiler};
pub use config::{Config, Toolchain};

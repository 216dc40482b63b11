//! Common types and errors shared by the Themis judging crates.

pub mod error;
pub mod types;

pub use error::{JudgeError, JudgeResult};
pub use types::*;

//! Test case discovery from a task directory
//!
//! A task directory holds `*.in` / `*.out` pairs whose file names carry a
//! number (`game001.in`, `game001.out`). The first run of digits in the name
//! pairs the files and orders the cases.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use themis_common::{JudgeError, JudgeResult, TestCase};
use walkdir::WalkDir;

static CASE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("case number pattern is valid"));

#[derive(Debug, Default)]
struct Pair {
    input: Option<PathBuf>,
    expected: Option<PathBuf>,
}

/// Number embedded in a test file name, if any.
pub fn case_number(file_name: &str) -> Option<u64> {
    CASE_NUMBER
        .find(file_name)
        .and_then(|m| m.as_str().parse().ok())
}

/// Collect the complete input/expected pairs in `task_dir`, ordered by case number.
///
/// Weights are taken from `weights` by position among the complete pairs;
/// cases past the end of the list weigh 1. Files without a number and
/// numbers missing one half of the pair are skipped with a warning.
pub fn discover(task_dir: &Path, weights: &[u32]) -> JudgeResult<Vec<TestCase>> {
    let mut pairs: BTreeMap<u64, Pair> = BTreeMap::new();

    for entry in WalkDir::new(task_dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            JudgeError::io(
                format!("cannot read task directory {}", task_dir.display()),
                e.into(),
            )
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(number) = case_number(name) else {
            continue;
        };

        match path.extension().and_then(|e| e.to_str()) {
            Some("in") => pairs.entry(number).or_default().input = Some(path.to_path_buf()),
            Some("out") => pairs.entry(number).or_default().expected = Some(path.to_path_buf()),
            _ => {}
        }
    }

    let mut cases = Vec::with_capacity(pairs.len());
    for (number, pair) in pairs {
        match (pair.input, pair.expected) {
            (Some(input), Some(expected)) => {
                let weight = weights.get(cases.len()).copied().unwrap_or(1);
                cases.push(TestCase::new(number.to_string(), input, expected, weight));
            }
            _ => {
                tracing::warn!(case = number, "Test case is missing its input or output file");
            }
        }
    }

    tracing::debug!(dir = %task_dir.display(), count = cases.len(), "Discovered test cases");
    Ok(cases)
}

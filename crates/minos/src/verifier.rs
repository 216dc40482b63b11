//! Output verification: structural text comparison or an external checker.
//!
//! The strategy is picked once per run. It only ever sees cases whose
//! execution ended cleanly within limits.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use themis_common::{JudgeError, JudgeResult, TestCase, Verdict};
use tokio::process::Command;
use tokio::time::{timeout, Duration};

/// Characters stripped from the end of every line before comparing.
const TRAILING_WHITESPACE: &[u8] = b" \t\n\r\x0b\x0c";

/// Bytes of checker stderr kept as a case diagnostic.
const CHECKER_DIAGNOSTIC_BYTES: usize = 4096;

/// A compiled special-judge program.
#[derive(Debug, Clone)]
pub struct CheckerProgram {
    pub path: PathBuf,
    pub time_limit: Duration,
}

impl CheckerProgram {
    pub fn new(path: impl Into<PathBuf>, time_limit: Duration) -> Self {
        Self {
            path: path.into(),
            time_limit,
        }
    }
}

/// How produced output is judged.
#[derive(Debug, Clone)]
pub enum Verifier {
    /// Line-by-line comparison ignoring trailing whitespace
    Diff,
    /// Delegate to `checker <input> <produced> <expected>`
    Checker(CheckerProgram),
}

/// Verdict plus whatever the verifier had to say about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub verdict: Verdict,
    pub diagnostic: Option<String>,
}

impl Verification {
    fn plain(verdict: Verdict) -> Self {
        Self {
            verdict,
            diagnostic: None,
        }
    }
}

impl Verifier {
    /// Judge `produced` against `case`.
    ///
    /// Unreadable files and checker malfunctions come back as
    /// [`Verdict::Unknown`]; only a checker that cannot be started at all is
    /// an error.
    pub async fn verify(&self, case: &TestCase, produced: &Path) -> JudgeResult<Verification> {
        match self {
            Verifier::Diff => compare_files(&case.expected_path, produced).await,
            Verifier::Checker(checker) => run_checker(checker, case, produced).await,
        }
    }
}

/// Compare two files line by line on the blocking pool.
pub async fn compare_files(expected: &Path, produced: &Path) -> JudgeResult<Verification> {
    let expected = expected.to_path_buf();
    let produced = produced.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let opened = File::open(&expected).and_then(|e| Ok((e, File::open(&produced)?)));
        let (expected_file, produced_file) = match opened {
            Ok(files) => files,
            Err(e) => {
                return Verification {
                    verdict: Verdict::Unknown,
                    diagnostic: Some(format!("cannot open output for comparison: {}", e)),
                };
            }
        };

        match compare_lines(BufReader::new(expected_file), BufReader::new(produced_file)) {
            Ok(verdict) => Verification::plain(verdict),
            Err(e) => Verification {
                verdict: Verdict::Unknown,
                diagnostic: Some(format!("cannot read output for comparison: {}", e)),
            },
        }
    })
    .await
    .map_err(|e| JudgeError::Internal(e.to_string()))
}

/// Compare two streams, ignoring trailing whitespace on each line.
///
/// Every expected line needs a matching produced line. Once the expected
/// stream is exhausted, the produced stream may only contain blank lines.
pub fn compare_lines<E: BufRead, P: BufRead>(mut expected: E, mut produced: P) -> io::Result<Verdict> {
    let mut want = Vec::new();
    let mut got = Vec::new();

    loop {
        want.clear();
        if expected.read_until(b'\n', &mut want)? == 0 {
            break;
        }
        got.clear();
        if produced.read_until(b'\n', &mut got)? == 0 {
            return Ok(Verdict::WrongAnswer);
        }
        if trim_trailing(&want) != trim_trailing(&got) {
            return Ok(Verdict::WrongAnswer);
        }
    }

    loop {
        got.clear();
        if produced.read_until(b'\n', &mut got)? == 0 {
            return Ok(Verdict::Accepted);
        }
        if !trim_trailing(&got).is_empty() {
            return Ok(Verdict::WrongAnswer);
        }
    }
}

fn trim_trailing(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|b| !TRAILING_WHITESPACE.contains(b))
        .map_or(0, |i| i + 1);
    &line[..end]
}

/// Run a testlib-style checker: `checker <input> <output> <answer>`.
async fn run_checker(
    checker: &CheckerProgram,
    case: &TestCase,
    produced: &Path,
) -> JudgeResult<Verification> {
    let mut child = Command::new(&checker.path)
        .arg(&case.input_path)
        .arg(produced)
        .arg(&case.expected_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| JudgeError::Spawn {
            program: checker.path.clone(),
            source,
        })?;

    let stderr = child.stderr.take();
    let capture = async move {
        match stderr {
            Some(stderr) => sisyphus::read_bounded(stderr, CHECKER_DIAGNOSTIC_BYTES).await,
            None => Ok((Vec::new(), false)),
        }
    };

    let waited = timeout(checker.time_limit, async {
        tokio::try_join!(child.wait(), capture)
    })
    .await;

    let (status, (captured, _)) = match waited {
        Ok(Ok(done)) => done,
        Ok(Err(e)) => {
            return Ok(Verification {
                verdict: Verdict::Unknown,
                diagnostic: Some(format!("checker wait failed: {}", e)),
            });
        }
        Err(_) => {
            let _ = child.kill().await;
            tracing::warn!(case = %case.label, "Checker timed out");
            return Ok(Verification {
                verdict: Verdict::Unknown,
                diagnostic: Some(format!(
                    "checker timed out after {}ms",
                    checker.time_limit.as_millis()
                )),
            });
        }
    };

    let stderr = excerpt(&captured);

    // Testlib exit codes: 0 = AC, 1 = WA, 2 = PE (treated as WA)
    let verification = match status.code() {
        Some(0) => Verification::plain(Verdict::Accepted),
        Some(1) | Some(2) => Verification {
            verdict: Verdict::WrongAnswer,
            diagnostic: stderr,
        },
        Some(code) => {
            tracing::warn!(case = %case.label, code, "Checker malfunction");
            Verification {
                verdict: Verdict::Unknown,
                diagnostic: Some(format!(
                    "checker exited with code {}: {}",
                    code,
                    stderr.unwrap_or_default()
                )),
            }
        }
        None => Verification {
            verdict: Verdict::Unknown,
            diagnostic: Some("checker terminated by signal".to_string()),
        },
    };

    Ok(verification)
}

fn excerpt(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes).trim_end().to_string();
    if text.is_empty() { None } else { Some(text) }
}

//! Compilation logic for Sisyphus.
//!
//! The toolchain is invoked exactly once per source file. Only the caller's
//! argument template and include directories reach the command line; the
//! artifact lands at the caller-chosen path and the caller owns its cleanup.

use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use crate::config::{Config, INCLUDES_PLACEHOLDER, OUTPUT_PLACEHOLDER, SOURCE_PLACEHOLDER};

/// Why a build did not produce an artifact.
#[derive(Error, Debug)]
pub enum CompileError {
    /// The toolchain rejected the source; carries its stderr
    #[error("Compilation failed:\n{diagnostics}")]
    Failed { diagnostics: String },

    /// The toolchain ran past the compile timeout
    #[error("Compilation timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The toolchain itself could not be started
    #[error("Failed to run toolchain {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl CompileError {
    /// Diagnostic text to show the submitter, if this is a submission-level failure.
    pub fn diagnostics(&self) -> Option<String> {
        match self {
            CompileError::Failed { diagnostics } => Some(diagnostics.clone()),
            CompileError::Timeout { .. } => Some(self.to_string()),
            CompileError::Spawn { .. } => None,
        }
    }
}

/// Compiler handles the compilation of submissions and checkers.
#[derive(Debug, Clone)]
pub struct Compiler {
    config: Config,
}

impl Compiler {
    /// Create a new compiler with the given configuration.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Compile a submission and return the path to the executable.
    pub async fn compile(&self, source: &Path, output: &Path) -> Result<PathBuf, CompileError> {
        self.compile_with_includes(source, output, &[]).await
    }

    /// Compile a checker, adding the configured include directories (`testlib.h`).
    pub async fn compile_checker(
        &self,
        source: &Path,
        output: &Path,
    ) -> Result<PathBuf, CompileError> {
        let includes = self.config.checker_include_dirs.clone();
        self.compile_with_includes(source, output, &includes).await
    }

    /// Compile `source` into `output` with extra include directories.
    pub async fn compile_with_includes(
        &self,
        source: &Path,
        output: &Path,
        include_dirs: &[PathBuf],
    ) -> Result<PathBuf, CompileError> {
        let program = self.config.toolchain.program.clone();
        let mut command = self.build_command(source, output, include_dirs);

        tracing::debug!(
            program = %program,
            source = %source.display(),
            output = %output.display(),
            "Invoking toolchain"
        );

        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CompileError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stderr = child.stderr.take();
        let limit = self.config.max_diagnostic_bytes;
        let capture = async move {
            match stderr {
                Some(stderr) => read_bounded(stderr, limit).await,
                None => Ok((Vec::new(), false)),
            }
        };

        let secs = self.config.compile_timeout_secs;
        let waited = timeout(Duration::from_secs(secs), async {
            tokio::try_join!(child.wait(), capture)
        })
        .await;

        let (status, (captured, truncated)) = match waited {
            Ok(Ok(done)) => done,
            Ok(Err(source)) => return Err(CompileError::Spawn { program, source }),
            Err(_) => {
                let _ = child.kill().await;
                tracing::warn!(source = %source.display(), secs, "Toolchain timed out");
                return Err(CompileError::Timeout { secs });
            }
        };

        let mut diagnostics = String::from_utf8_lossy(&captured).into_owned();
        if truncated {
            diagnostics.push_str("\n... (diagnostics truncated)");
        }

        if !status.success() {
            tracing::info!(
                source = %source.display(),
                exit_code = ?status.code(),
                "Compilation failed"
            );
            return Err(CompileError::Failed { diagnostics });
        }

        // A zero exit without an artifact is still a failed build
        let meta = match fs::metadata(output).await {
            Ok(meta) if meta.is_file() => meta,
            _ => {
                return Err(CompileError::Failed {
                    diagnostics: format!(
                        "toolchain exited successfully but produced no executable at {}\n{}",
                        output.display(),
                        diagnostics
                    ),
                });
            }
        };

        let mut perms = meta.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(output, perms)
            .await
            .map_err(|e| CompileError::Failed {
                diagnostics: format!("cannot mark {} executable: {}", output.display(), e),
            })?;

        tracing::debug!(output = %output.display(), "Compilation succeeded");
        Ok(output.to_path_buf())
    }

    /// Expand the argument template into a ready-to-spawn command.
    fn build_command(&self, source: &Path, output: &Path, include_dirs: &[PathBuf]) -> Command {
        let toolchain = &self.config.toolchain;
        let mut command = Command::new(&toolchain.program);

        for arg in &toolchain.args {
            if arg == INCLUDES_PLACEHOLDER {
                for dir in include_dirs {
                    let mut include = std::ffi::OsString::from("-I");
                    include.push(dir.as_os_str());
                    command.arg(include);
                }
            } else if arg == SOURCE_PLACEHOLDER {
                command.arg(source);
            } else if arg == OUTPUT_PLACEHOLDER {
                command.arg(output);
            } else {
                command.arg(arg);
            }
        }

        command
    }
}

/// Read at most `limit` bytes, then drain the rest so the child never blocks on a full pipe.
pub async fn read_bounded<R>(mut reader: R, limit: usize) -> io::Result<(Vec<u8>, bool)>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    (&mut reader).take(limit as u64).read_to_end(&mut buf).await?;
    let rest = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
    Ok((buf, rest > 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Toolchain;

    fn shell_toolchain(script: &str) -> Config {
        Config {
            toolchain: Toolchain {
                program: "sh".to_string(),
                args: vec![
                    "-c".to_string(),
                    script.to_string(),
                    SOURCE_PLACEHOLDER.to_string(),
                    OUTPUT_PLACEHOLDER.to_string(),
                ],
            },
            compile_timeout_secs: 5,
            checker_include_dirs: Vec::new(),
            max_diagnostic_bytes: 1024,
        }
    }

    #[test]
    fn test_build_command_expands_placeholders() {
        let mut config = Config::default();
        config.toolchain = Toolchain::cxx("g++", "-O2");
        let compiler = Compiler::new(config);

        let command = compiler.build_command(
            Path::new("/src/main.cpp"),
            Path::new("/tmp/main"),
            &[PathBuf::from("/opt/testlib")],
        );
        let args: Vec<_> = command
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            args,
            vec!["-O2", "-I/opt/testlib", "-o", "/tmp/main", "/src/main.cpp"]
        );
    }

    #[test]
    fn test_build_command_without_includes() {
        let compiler = Compiler::new(Config::default());
        let command = compiler.build_command(Path::new("a.cpp"), Path::new("a"), &[]);
        let args: Vec<_> = command.as_std().get_args().collect();
        assert!(!args.iter().any(|a| a.to_string_lossy().starts_with("-I")));
    }

    #[tokio::test]
    async fn test_compile_success_produces_executable() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("main.sh");
        std::fs::write(&source, "#!/bin/sh\necho hi\n").unwrap();
        let output = dir.path().join("main");

        let compiler = Compiler::new(shell_toolchain("cp \"$0\" \"$1\""));
        let artifact = compiler.compile(&source, &output).await.unwrap();

        assert_eq!(artifact, output);
        let mode = std::fs::metadata(&artifact).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[tokio::test]
    async fn test_compile_failure_keeps_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("main.cpp");
        std::fs::write(&source, "int main( {").unwrap();

        let compiler = Compiler::new(shell_toolchain("echo 'error: expected )' >&2; exit 1"));
        let err = compiler
            .compile(&source, &dir.path().join("main"))
            .await
            .unwrap_err();

        match err {
            CompileError::Failed { diagnostics } => {
                assert!(diagnostics.contains("error: expected )"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_diagnostics_are_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("main.cpp");
        std::fs::write(&source, "").unwrap();

        let compiler = Compiler::new(shell_toolchain(
            "i=0; while [ $i -lt 400 ]; do echo 'xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx' >&2; i=$((i+1)); done; exit 1",
        ));
        let err = compiler
            .compile(&source, &dir.path().join("main"))
            .await
            .unwrap_err();

        let diagnostics = err.diagnostics().unwrap();
        assert!(diagnostics.ends_with("(diagnostics truncated)"));
        assert!(diagnostics.len() < 1024 + 64);
    }

    #[tokio::test]
    async fn test_zero_exit_without_artifact_fails() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("main.cpp");
        std::fs::write(&source, "").unwrap();

        let compiler = Compiler::new(shell_toolchain("exit 0"));
        let err = compiler
            .compile(&source, &dir.path().join("main"))
            .await
            .unwrap_err();
        assert!(matches!(err, CompileError::Failed { .. }));
    }

    #[tokio::test]
    async fn test_missing_toolchain_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.toolchain.program = "/nonexistent/toolchain".to_string();

        let err = Compiler::new(config)
            .compile(&dir.path().join("a.cpp"), &dir.path().join("a"))
            .await
            .unwrap_err();
        assert!(matches!(err, CompileError::Spawn { .. }));
        assert!(err.diagnostics().is_none());
    }

    #[tokio::test]
    async fn test_compile_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = shell_toolchain("exec sleep 10");
        config.compile_timeout_secs = 1;

        let err = Compiler::new(config)
            .compile(&dir.path().join("a.cpp"), &dir.path().join("a"))
            .await
            .unwrap_err();
        assert!(matches!(err, CompileError::Timeout { secs: 1 }));
    }
}

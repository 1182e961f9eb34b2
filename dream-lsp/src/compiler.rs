//! External Dream compiler invocation.
//!
//! The compiler is an opaque executable: document text goes in through a
//! temp file, symbols come back as JSON on stdout (`--symbols`), and
//! diagnostics come back as text on stderr. Every call is bounded by
//! [`COMPILE_TIMEOUT`]; a timed-out child is killed. A non-zero exit status
//! is not an invocation failure — stderr is still parsed — only a failed
//! spawn or a timeout is.

use std::ffi::OsStr;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use miette::Diagnostic;
use thiserror::Error;

pub const COMPILE_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Error, Diagnostic)]
pub enum CompilerError {
    #[error("failed to launch {exe}: {source}")]
    #[diagnostic(code(dream::compiler::spawn))]
    Spawn {
        exe: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{exe} timed out after {timeout_ms}ms")]
    #[diagnostic(code(dream::compiler::timeout))]
    Timeout { exe: String, timeout_ms: u128 },

    #[error("failed to stage source for {exe}: {source}")]
    #[diagnostic(code(dream::compiler::stage))]
    Stage {
        exe: String,
        #[source]
        source: std::io::Error,
    },
}

/// Platform name of the parse executable.
pub fn parse_executable_name() -> &'static str {
    if cfg!(windows) { "parse.exe" } else { "parse" }
}

/// Resolve the parse executable, trying in order: an explicit override
/// (settings or `dream.toml`), `zig-out/bin` under the workspace root,
/// `zig-out/bin` under the current directory, then the bare name from PATH.
pub fn locate_parse_executable(
    override_path: Option<&Path>,
    workspace_root: Option<&Path>,
) -> PathBuf {
    if let Some(p) = override_path {
        return p.to_path_buf();
    }

    let exe = parse_executable_name();
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(root) = workspace_root {
        candidates.push(root.join("zig-out").join("bin").join(exe));
    }
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join("zig-out").join("bin").join(exe));
    }

    for candidate in &candidates {
        if candidate.exists() {
            return candidate.clone();
        }
    }

    PathBuf::from(exe)
}

/// Raw output of one compiler call.
#[derive(Debug, Default)]
pub struct CompilerOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

fn drain_to_string(pipe: Option<impl Read + Send + 'static>) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_string(&mut buf);
        }
        buf
    })
}

/// Run the compiler with a hard deadline. Output pipes are drained on
/// separate threads so a chatty child cannot deadlock against a full pipe
/// buffer while we poll for exit.
pub fn run_compiler(
    exe: &Path,
    args: &[&OsStr],
    timeout: Duration,
) -> Result<CompilerOutput, CompilerError> {
    let exe_name = exe.display().to_string();

    let mut child = Command::new(exe)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| CompilerError::Spawn {
            exe: exe_name.clone(),
            source,
        })?;

    let stdout = drain_to_string(child.stdout.take());
    let stderr = drain_to_string(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(CompilerError::Timeout {
                        exe: exe_name,
                        timeout_ms: timeout.as_millis(),
                    });
                }
                std::thread::sleep(Duration::from_millis(10));
            }
            Err(source) => {
                let _ = child.kill();
                return Err(CompilerError::Spawn {
                    exe: exe_name,
                    source,
                });
            }
        }
    };

    Ok(CompilerOutput {
        success: status.success(),
        stdout: stdout.join().unwrap_or_default(),
        stderr: stderr.join().unwrap_or_default(),
    })
}

/// Both passes of one analysis: `--symbols` for the symbol JSON, then a
/// plain run for diagnostics on stderr.
#[derive(Debug, Default)]
pub struct RawAnalysis {
    pub success: bool,
    pub symbols_json: String,
    pub diagnostics_stderr: String,
}

/// Stage `text` into a temp file and run both compiler passes against it.
/// The temp file is removed on every exit path, including errors.
pub fn analyze_source(exe: &Path, text: &str) -> Result<RawAnalysis, CompilerError> {
    let exe_name = exe.display().to_string();

    let mut staged = tempfile::Builder::new()
        .prefix("dream_lsp_")
        .suffix(".dr")
        .tempfile()
        .map_err(|source| CompilerError::Stage {
            exe: exe_name.clone(),
            source,
        })?;
    staged
        .write_all(text.as_bytes())
        .map_err(|source| CompilerError::Stage {
            exe: exe_name,
            source,
        })?;

    let path = staged.path().as_os_str();

    let symbols = run_compiler(exe, &[OsStr::new("--symbols"), path], COMPILE_TIMEOUT)?;
    let diag = run_compiler(exe, &[path], COMPILE_TIMEOUT)?;

    Ok(RawAnalysis {
        success: diag.success,
        symbols_json: symbols.stdout,
        diagnostics_stderr: diag.stderr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_path_wins_over_discovery() {
        let override_path = PathBuf::from("/opt/dream/bin/parse-custom");
        let found = locate_parse_executable(Some(&override_path), Some(Path::new("/tmp")));
        assert_eq!(found, override_path);
    }

    #[test]
    fn workspace_zig_out_is_preferred_when_present() {
        let root = tempfile::tempdir().unwrap();
        let bin = root.path().join("zig-out").join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let exe = bin.join(parse_executable_name());
        std::fs::write(&exe, b"").unwrap();

        let found = locate_parse_executable(None, Some(root.path()));
        assert_eq!(found, exe);
    }

    #[test]
    fn discovery_falls_back_to_bare_name() {
        let empty = tempfile::tempdir().unwrap();
        let found = locate_parse_executable(None, Some(empty.path()));
        assert_eq!(found, PathBuf::from(parse_executable_name()));
    }

    #[test]
    fn spawn_failure_is_reported_not_panicked() {
        let err = run_compiler(
            Path::new("/nonexistent/dream-parse-binary"),
            &[],
            COMPILE_TIMEOUT,
        )
        .unwrap_err();
        assert!(matches!(err, CompilerError::Spawn { .. }));
        assert!(err.to_string().contains("failed to launch"));
    }

    #[test]
    fn analyze_source_surfaces_spawn_errors() {
        let err = analyze_source(Path::new("/nonexistent/dream-parse-binary"), "func main() {}")
            .unwrap_err();
        assert!(matches!(err, CompilerError::Spawn { .. }));
    }
}

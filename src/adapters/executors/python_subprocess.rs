//! Python executor backed by a fresh interpreter process per run.
//!
//! Every call spawns `python -I -` in an empty temporary directory with a
//! cleared environment, so nothing leaks between runs. Globals are bound by
//! a generated prelude that decodes each value from JSON.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::domain::models::{ExecutionResult, ExecutionStatus, ExecutorConfig};
use crate::domain::ports::{CodeExecutor, ExecutorError};

/// Builtins rejected in candidate code
pub const DANGEROUS_BUILTINS: [&str; 16] = [
    "exec", "eval", "compile", "__import__", "open", "file", "input", "raw_input", "reload",
    "vars", "locals", "globals", "dir", "getattr", "setattr", "delattr",
];

/// Modules candidate code may not import
pub const DANGEROUS_MODULES: [&str; 13] = [
    "os", "sys", "subprocess", "socket", "urllib", "requests", "shutil", "tempfile", "pickle",
    "marshal", "imp", "importlib", "ctypes",
];

static BUILTIN_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b({})\s*\(", DANGEROUS_BUILTINS.join("|")))
        .expect("builtin call pattern is valid")
});

static MODULE_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?m)^\s*(?:import|from)\s+({})\b",
        DANGEROUS_MODULES.join("|")
    ))
    .expect("module import pattern is valid")
});

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

const PRELUDE_JSON: &str = "_specforge_prelude_json";

/// First dangerous construct found in `code`, if any.
pub fn security_check(code: &str) -> Option<String> {
    if let Some(m) = BUILTIN_CALL.captures(code).and_then(|c| c.get(1)) {
        return Some(format!("dangerous builtin: {}", m.as_str()));
    }
    MODULE_IMPORT
        .captures(code)
        .and_then(|c| c.get(1))
        .map(|m| format!("dangerous module import: {}", m.as_str()))
}

fn render_prelude(globals: &HashMap<String, Value>) -> Result<String, ExecutorError> {
    let mut names: Vec<&String> = globals.keys().collect();
    names.sort();

    let mut prelude = format!("import json as {PRELUDE_JSON}\n");
    for name in names {
        if !IDENTIFIER.is_match(name) {
            return Err(ExecutorError::InvalidGlobal(name.clone()));
        }
        let encoded = serde_json::to_string(&globals[name])
            .map_err(|_| ExecutorError::InvalidGlobal(name.clone()))?;
        // a JSON string literal is also a valid Python string literal
        let literal = serde_json::to_string(&encoded)
            .map_err(|_| ExecutorError::InvalidGlobal(name.clone()))?;
        let _ = writeln!(prelude, "{name} = {PRELUDE_JSON}.loads({literal})");
    }
    let _ = writeln!(prelude, "del {PRELUDE_JSON}");
    Ok(prelude)
}

/// Runs candidate code in a fresh interpreter process.
pub struct PythonSubprocessExecutor {
    python: String,
    timeout: Duration,
    enable_security: bool,
}

impl PythonSubprocessExecutor {
    /// Executor using `config`
    pub fn new(config: &ExecutorConfig) -> Self {
        Self {
            python: config.python.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            enable_security: config.enable_security,
        }
    }
}

#[async_trait]
impl CodeExecutor for PythonSubprocessExecutor {
    async fn run(
        &self,
        code: &str,
        globals: &HashMap<String, Value>,
    ) -> Result<ExecutionResult, ExecutorError> {
        if code.trim().is_empty() {
            return Ok(ExecutionResult::failure("Code is empty"));
        }
        if self.enable_security {
            if let Some(reason) = security_check(code) {
                tracing::warn!(%reason, "Snippet rejected by security check");
                return Ok(ExecutionResult {
                    status: ExecutionStatus::SecurityError,
                    error: Some(format!("Security check failed: {reason}")),
                    ..ExecutionResult::failure("")
                });
            }
        }

        let program = format!("{}{code}\n", render_prelude(globals)?);
        let workdir = tempfile::tempdir().map_err(|e| ExecutorError::Io(e.to_string()))?;

        let mut child = Command::new(&self.python)
            .args(["-I", "-"])
            .current_dir(workdir.path())
            .env_clear()
            .env("PATH", std::env::var_os("PATH").unwrap_or_default())
            .env("PYTHONIOENCODING", "utf-8")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecutorError::SpawnFailed(format!("{}: {e}", self.python)))?;

        let start = Instant::now();
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(program.as_bytes())
                .await
                .map_err(|e| ExecutorError::Io(e.to_string()))?;
        }

        let Ok(output) = tokio::time::timeout(self.timeout, child.wait_with_output()).await else {
            tracing::warn!(timeout_secs = self.timeout.as_secs(), "Snippet timed out");
            return Ok(ExecutionResult {
                status: ExecutionStatus::Timeout,
                error: Some(format!(
                    "Execution timed out after {}s",
                    self.timeout.as_secs()
                )),
                ..ExecutionResult::failure("")
            }
            .with_time(start.elapsed()));
        };
        let output = output.map_err(|e| ExecutorError::Io(e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let result = if output.status.success() {
            ExecutionResult {
                stderr,
                ..ExecutionResult::success(stdout)
            }
        } else {
            let error = if stderr.trim().is_empty() {
                format!("Interpreter exited with {}", output.status)
            } else {
                stderr.trim().to_string()
            };
            ExecutionResult {
                stdout,
                stderr,
                ..ExecutionResult::failure(error)
            }
        };
        Ok(result.with_time(start.elapsed()))
    }
}

//! Database init script runner
//!
//! Applies an SQL script through `psql -f`. No retry and no transactional
//! wrapping: if the script fails halfway, the database keeps whatever the
//! script already did and the run reports a failure.

use crate::database::{failure_text, Psql, PsqlInput};
use async_trait::async_trait;
use stackcheck_common::{CheckError, PostgresTarget, ProbeResult};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Outcome of one script run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRun {
    pub result: ProbeResult,
    /// Captured stdout, shown to the user on success
    pub stdout: String,
}

impl ScriptRun {
    fn failed(err: CheckError) -> Self {
        Self {
            result: err.into(),
            stdout: String::new(),
        }
    }
}

#[async_trait]
pub trait ScriptRunner: Send + Sync {
    async fn run(&self, script: &Path) -> ScriptRun;
}

// ============================================================================
// psql runner (Production)
// ============================================================================

pub struct PsqlScriptRunner {
    psql: Psql,
    limit: Duration,
}

impl PsqlScriptRunner {
    pub fn new(target: PostgresTarget, limit: Duration) -> Self {
        Self {
            psql: Psql::new(target),
            limit,
        }
    }
}

#[async_trait]
impl ScriptRunner for PsqlScriptRunner {
    async fn run(&self, script: &Path) -> ScriptRun {
        if !script.is_file() {
            return ScriptRun::failed(CheckError::Configuration(format!(
                "file not found: {}",
                script.display()
            )));
        }

        let output = match self.psql.exec(PsqlInput::File(script), self.limit).await {
            Ok(output) => output,
            Err(CheckError::DependencyUnavailable(reason)) => {
                return ScriptRun::failed(CheckError::Execution(reason))
            }
            Err(e) => return ScriptRun::failed(e),
        };

        if output.status.success() {
            ScriptRun {
                result: ProbeResult::Success,
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            }
        } else {
            ScriptRun::failed(CheckError::Execution(failure_text(&output)))
        }
    }
}

// ============================================================================
// Fake runner (Testing)
// ============================================================================

/// Script runner with a canned result that records every invocation
#[derive(Clone)]
pub struct FakeScriptRunner {
    result: ProbeResult,
    stdout: String,
    invocations: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeScriptRunner {
    pub fn new(result: ProbeResult) -> Self {
        Self {
            result,
            stdout: String::new(),
            invocations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn ok() -> Self {
        Self::new(ProbeResult::Success)
    }

    pub fn with_stdout(mut self, stdout: &str) -> Self {
        self.stdout = stdout.to_string();
        self
    }

    /// Scripts passed to `run`, in order
    pub fn invocations(&self) -> Vec<PathBuf> {
        self.invocations
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.invocations().len()
    }
}

#[async_trait]
impl ScriptRunner for FakeScriptRunner {
    async fn run(&self, script: &Path) -> ScriptRun {
        if let Ok(mut calls) = self.invocations.lock() {
            calls.push(script.to_path_buf());
        }
        ScriptRun {
            result: self.result.clone(),
            stdout: self.stdout.clone(),
        }
    }
}

//! Check outcomes
//!
//! Every check in a verification run resolves to a [`ProbeResult`]. Results are
//! collected in a [`CheckOutcomeSet`] in execution order, and the final verdict
//! is folded from that set on demand rather than stored.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of a single check attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ProbeResult {
    /// The check passed
    Success,
    /// The check was attempted and failed
    Failure(String),
    /// The access path's dependency is unavailable, so nothing was attempted
    NotApplicable(String),
}

impl ProbeResult {
    pub fn failure(reason: impl Into<String>) -> Self {
        ProbeResult::Failure(reason.into())
    }

    pub fn not_applicable(reason: impl Into<String>) -> Self {
        ProbeResult::NotApplicable(reason.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProbeResult::Success)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ProbeResult::Failure(_))
    }

    pub fn is_applicable(&self) -> bool {
        !matches!(self, ProbeResult::NotApplicable(_))
    }

    /// Failure or not-applicable reason, if any
    pub fn reason(&self) -> Option<&str> {
        match self {
            ProbeResult::Success => None,
            ProbeResult::Failure(r) | ProbeResult::NotApplicable(r) => Some(r),
        }
    }
}

/// Error taxonomy for checks.
///
/// Errors never escape a probe: they are converted into a [`ProbeResult`] at
/// the probe boundary via `From<CheckError>`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckError {
    /// Missing/placeholder required keys, missing config file
    #[error("{0}")]
    Configuration(String),

    /// Client, driver or library not installed
    #[error("{0}")]
    DependencyUnavailable(String),

    /// Timeout, DNS/TLS/auth failure, non-2xx status, non-zero exit
    #[error("{0}")]
    Connectivity(String),

    /// Malformed or unexpected response payload
    #[error("{0}")]
    Protocol(String),

    /// Script execution failure
    #[error("{0}")]
    Execution(String),
}

impl CheckError {
    pub fn timeout() -> Self {
        CheckError::Connectivity("timeout".to_string())
    }
}

impl From<CheckError> for ProbeResult {
    fn from(err: CheckError) -> Self {
        match err {
            CheckError::DependencyUnavailable(reason) => ProbeResult::NotApplicable(reason),
            other => ProbeResult::Failure(other.to_string()),
        }
    }
}

impl From<Result<(), CheckError>> for ProbeResult {
    fn from(res: Result<(), CheckError>) -> Self {
        match res {
            Ok(()) => ProbeResult::Success,
            Err(e) => e.into(),
        }
    }
}

/// Named checks, in the order a run executes them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckName {
    EnvFile,
    PostgresPsql,
    PostgresNative,
    SqlExecution,
    RedisRest,
    RedisNative,
}

impl CheckName {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckName::EnvFile => "env_file",
            CheckName::PostgresPsql => "postgres_psql",
            CheckName::PostgresNative => "postgres_native",
            CheckName::SqlExecution => "sql_execution",
            CheckName::RedisRest => "redis_rest",
            CheckName::RedisNative => "redis_native",
        }
    }
}

impl fmt::Display for CheckName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recording the same check twice is a programming error in the caller
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("check '{0}' already recorded")]
pub struct DuplicateCheck(pub CheckName);

/// Insertion-ordered check outcomes for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckOutcomeSet {
    entries: Vec<(CheckName, ProbeResult)>,
}

impl CheckOutcomeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an outcome. A check name may appear at most once.
    pub fn record(&mut self, check: CheckName, result: ProbeResult) -> Result<(), DuplicateCheck> {
        if self.contains(check) {
            return Err(DuplicateCheck(check));
        }
        self.entries.push((check, result));
        Ok(())
    }

    pub fn get(&self, check: CheckName) -> Option<&ProbeResult> {
        self.entries
            .iter()
            .find(|(name, _)| *name == check)
            .map(|(_, result)| result)
    }

    /// Absence means the check was skipped, not that it was inapplicable
    pub fn contains(&self, check: CheckName) -> bool {
        self.get(check).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CheckName, &ProbeResult)> {
        self.entries.iter().map(|(name, result)| (*name, result))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if any of the given checks succeeded
    pub fn any_success(&self, checks: &[CheckName]) -> bool {
        checks
            .iter()
            .any(|c| self.get(*c).map(ProbeResult::is_success).unwrap_or(false))
    }

    /// Final verdict: AND over every applicable outcome.
    ///
    /// `NotApplicable` entries are dropped from the fold entirely, so they
    /// neither pass nor fail the run. An empty set passes.
    pub fn verdict(&self) -> bool {
        self.entries
            .iter()
            .filter(|(_, result)| result.is_applicable())
            .all(|(_, result)| result.is_success())
    }

    /// Names of failed checks, in execution order
    pub fn failed_checks(&self) -> Vec<CheckName> {
        self.entries
            .iter()
            .filter(|(_, result)| result.is_failure())
            .map(|(name, _)| *name)
            .collect()
    }

    /// Process exit code for this set: 0 on pass, 1 on fail
    pub fn exit_code(&self) -> i32 {
        if self.verdict() {
            0
        } else {
            1
        }
    }
}

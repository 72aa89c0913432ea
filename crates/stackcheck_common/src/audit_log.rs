//! Audit Log
//!
//! Run-scoped, append-only record of every check outcome.
//!
//! The file is truncated and header-stamped once when the run starts. Each
//! entry reopens the file in append mode and closes it again, so no handle is
//! held across probes.
//!
//! Line format: `[YYYY-MM-DD HH:MM:SS] <message>`. Multi-line messages (psql
//! stderr, raw response bodies) are folded into a single line joined by ` | `.

use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Timestamp format used for every entry
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const RULE: &str = "# ============================================";

#[derive(Debug, thiserror::Error)]
#[error("audit log {path} is not writable: {source}")]
pub struct AuditError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Handle to the current run's audit log
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    /// Create (or truncate) the log and write the run header.
    ///
    /// Parent directories are created as needed. Failure here is fatal to the
    /// run, since nothing could be recorded afterwards.
    pub fn create(path: &Path, title: &str) -> Result<Self, AuditError> {
        let wrap = |source| AuditError {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(wrap)?;
        }

        let header = format!(
            "{RULE}\n# {title}\n# Started: {}\n{RULE}\n\n",
            Local::now().format(TIMESTAMP_FORMAT)
        );
        fs::write(path, header).map_err(wrap)?;

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped entry
    pub fn append(&self, message: &str) -> Result<(), AuditError> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|source| AuditError {
                path: self.path.clone(),
                source,
            })?;

        writeln!(file, "{}", format_entry(message)).map_err(|source| AuditError {
            path: self.path.clone(),
            source,
        })
    }

    /// Append, downgrading a write failure to a warning.
    ///
    /// Once the log was created successfully a later write error should not
    /// abort the remaining checks.
    pub fn record(&self, message: &str) {
        if let Err(e) = self.append(message) {
            tracing::warn!("{}", e);
        }
    }
}

/// Format a single log line with the current local time
pub fn format_entry(message: &str) -> String {
    format!(
        "[{}] {}",
        Local::now().format(TIMESTAMP_FORMAT),
        single_line(message)
    )
}

fn single_line(message: &str) -> String {
    message
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Entry lines of a log (header and blank lines excluded)
pub fn entry_lines(content: &str) -> Vec<&str> {
    content.lines().filter(|l| l.starts_with('[')).collect()
}

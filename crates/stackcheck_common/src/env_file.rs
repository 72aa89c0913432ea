//! Env File Checker
//!
//! Parses a `KEY=VALUE` file into an immutable [`EnvRecord`] and verifies that
//! a set of required keys carry real (non-placeholder) values.

use crate::outcome::{CheckError, ProbeResult};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Keys a complete project `.env` must declare
pub const REQUIRED_KEYS: [&str; 8] = [
    "POSTGRES_URL",
    "POSTGRES_HOST",
    "POSTGRES_PASSWORD",
    "REDIS_URL",
    "OPENAI_API_KEY",
    "COHERE_API_KEY",
    "PINECONE_API_KEY",
    "NEO4J_URL",
];

/// Values starting with this character are template stubs like `<your-key>`
pub const PLACEHOLDER_SENTINEL: char = '<';

/// Literal stub left behind by unfilled templates
pub const PLACEHOLDER_STUB: &str = "your-";

#[derive(Debug, thiserror::Error)]
pub enum EnvFileError {
    #[error("env file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Variables declared in a single env file, frozen after load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvRecord {
    source: PathBuf,
    vars: HashMap<String, String>,
}

impl EnvRecord {
    pub fn load(path: &Path) -> Result<Self, EnvFileError> {
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => EnvFileError::NotFound(path.to_path_buf()),
            _ => EnvFileError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        })?;
        Ok(Self::parse(path, &content))
    }

    /// Parse `KEY=VALUE` lines. Blank lines and `#` comments are ignored, an
    /// optional `export ` prefix is stripped, and surrounding quotes on the
    /// value are removed. The first declaration of a key wins.
    pub fn parse(source: &Path, content: &str) -> Self {
        let mut vars = HashMap::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            vars.entry(key.to_string())
                .or_insert_with(|| unquote(value.trim()).to_string());
        }
        Self {
            source: source.to_path_buf(),
            vars,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Value for `key` only if it is a usable (non-placeholder) value
    pub fn get_usable(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !is_placeholder(v))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Empty, `<...>` stubs and the literal `your-` stub count as unset
pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.starts_with(PLACEHOLDER_SENTINEL) || value == PLACEHOLDER_STUB
}

/// Keys from `required` that are missing or hold a placeholder value.
///
/// Missing keys are reported bare, placeholder keys as `KEY (empty/placeholder)`.
pub fn missing_keys(record: &EnvRecord, required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter_map(|key| match record.get(key) {
            None => Some((*key).to_string()),
            Some(v) if is_placeholder(v) => Some(format!("{} (empty/placeholder)", key)),
            Some(_) => None,
        })
        .collect()
}

/// Verify that `source` declares every required key with a real value
pub fn verify(required: &[&str], source: &Path) -> ProbeResult {
    let record = match EnvRecord::load(source) {
        Ok(record) => record,
        Err(e) => return CheckError::Configuration(e.to_string()).into(),
    };

    let missing = missing_keys(&record, required);
    if missing.is_empty() {
        ProbeResult::Success
    } else {
        CheckError::Configuration(format!(
            "missing or placeholder variables: {}",
            missing.join(", ")
        ))
        .into()
    }
}

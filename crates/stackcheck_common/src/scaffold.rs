//! Project scaffolding
//!
//! Creates the standard directory layout and empty placeholder files, and
//! optionally tidies loose artifacts into it. Existing files are never
//! truncated or overwritten, so running either step twice is harmless.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// (directory, placeholder files inside it)
pub const LAYOUT: &[(&str, &[&str])] = &[
    ("workflows/raw", &[]),
    ("workflows/fixed", &[]),
    ("workflows/test-copies", &[]),
    ("workflows/final", &[]),
    ("config", &["n8n-env-vars.yaml", "postgres-schema.sql"]),
    ("scripts", &["init-db.sql"]),
    (
        "prompts",
        &[
            "agent1-setup.md",
            "agent2-import.md",
            "agent3-fix.md",
            "agent4-eval.md",
            "agent5-orchestrator.md",
        ],
    ),
    ("datasets", &[]),
    ("logs", &[]),
    ("error-logs", &[]),
    ("evaluations", &[]),
];

/// Production workflow exports, filed under `workflows/raw`
pub const PRODUCTION_WORKFLOWS: &[&str] = &[
    "orchestrator.json",
    "ingestion.json",
    "rag_graph.json",
    "rag_classic.json",
    "rag_tabular.json",
    "enrichment.json",
    "monitor.json",
];

/// Root-level files filed under `config`
pub const CONFIG_FILES: &[&str] = &["postgres-schema.sql", "n8n-env-vars.yaml"];

/// Root-level run artifacts filed under `logs`
pub const LOG_FILES: &[&str] = &["import-log.json", "evaluation-log.json", "agent4-summary.csv"];

const TEST_COPY_SUFFIX: &str = "_TestCopy.json";

#[derive(Debug, thiserror::Error)]
#[error("cannot prepare {path}: {source}")]
pub struct ScaffoldError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Create the layout under `root`, returning the paths that did not exist yet
pub fn scaffold(root: &Path) -> Result<Vec<PathBuf>, ScaffoldError> {
    let mut created = Vec::new();

    for (dir, files) in LAYOUT {
        let dir_path = root.join(dir);
        if !dir_path.is_dir() {
            fs::create_dir_all(&dir_path).map_err(|source| ScaffoldError {
                path: dir_path.clone(),
                source,
            })?;
            created.push(dir_path.clone());
        }

        for file in *files {
            let file_path = dir_path.join(file);
            if file_path.exists() {
                continue;
            }
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&file_path)
                .map_err(|source| ScaffoldError {
                    path: file_path.clone(),
                    source,
                })?;
            created.push(file_path);
        }
    }

    Ok(created)
}

/// What [`organize`] did with one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relocation {
    Moved { from: PathBuf, to: PathBuf },
    /// Destination already present; the source stays where it was
    Skipped { from: PathBuf, to: PathBuf },
}

/// File loose artifacts under `root` into the layout.
///
/// - `workflows/*_TestCopy.json` → `workflows/test-copies/`
/// - production workflows in `workflows/` → `workflows/raw/`
/// - `postgres-schema.sql`, `n8n-env-vars.yaml` → `config/`
/// - import/evaluation logs and the summary CSV → `logs/`
///
/// Sources that do not exist are ignored; nothing is overwritten.
pub fn organize(root: &Path) -> Result<Vec<Relocation>, ScaffoldError> {
    let mut plan = Vec::new();

    let workflows = root.join("workflows");
    if workflows.is_dir() {
        for name in file_names(&workflows)? {
            let dest = if name.ends_with(TEST_COPY_SUFFIX) {
                "workflows/test-copies"
            } else if PRODUCTION_WORKFLOWS.contains(&name.as_str()) {
                "workflows/raw"
            } else {
                continue;
            };
            plan.push((workflows.join(&name), root.join(dest).join(&name)));
        }
    }
    for name in CONFIG_FILES {
        plan.push((root.join(name), root.join("config").join(name)));
    }
    for name in LOG_FILES {
        plan.push((root.join(name), root.join("logs").join(name)));
    }

    let mut done = Vec::new();
    for (from, to) in plan {
        if let Some(relocation) = relocate(from, to)? {
            done.push(relocation);
        }
    }
    Ok(done)
}

/// Regular files directly inside `dir`, sorted
fn file_names(dir: &Path) -> Result<Vec<String>, ScaffoldError> {
    let wrap = |source| ScaffoldError {
        path: dir.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(wrap)? {
        let entry = entry.map_err(wrap)?;
        if !entry.file_type().map_err(wrap)?.is_file() {
            continue;
        }
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

fn relocate(from: PathBuf, to: PathBuf) -> Result<Option<Relocation>, ScaffoldError> {
    if !from.is_file() {
        return Ok(None);
    }
    if to.exists() {
        return Ok(Some(Relocation::Skipped { from, to }));
    }

    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|source| ScaffoldError {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::rename(&from, &to).map_err(|source| ScaffoldError {
        path: to.clone(),
        source,
    })?;
    Ok(Some(Relocation::Moved { from, to }))
}

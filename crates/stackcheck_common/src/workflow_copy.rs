//! Workflow test copies
//!
//! Produces a `_TestCopy` variant of an n8n workflow export in which every
//! webhook trigger is swapped for a chat trigger, so the workflow can be
//! exercised interactively without an HTTP caller.

use serde_json::{json, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const WEBHOOK_NODE_TYPE: &str = "n8n-nodes-base.webhook";
pub const CHAT_TRIGGER_NODE_TYPE: &str = "@n8n/n8n-nodes-langchain.chatTrigger";
pub const TEST_COPY_SUFFIX: &str = "_TestCopy";

/// Workflows copied when none are named explicitly
pub const DEFAULT_WORKFLOWS: [&str; 2] = ["orchestrator", "ingestion"];

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} is not a workflow object")]
    NotAnObject { path: PathBuf },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result of copying one workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCopy {
    pub target: PathBuf,
    /// Original names of the replaced webhook nodes
    pub replaced: Vec<String>,
}

/// Rename the workflow and swap webhook nodes for chat triggers, in place.
///
/// Returns the original names of the nodes that were replaced.
pub fn convert_to_test_copy(workflow: &mut Value) -> Vec<String> {
    let Some(obj) = workflow.as_object_mut() else {
        return Vec::new();
    };

    let name = obj.get("name").and_then(Value::as_str).unwrap_or_default();
    let renamed = format!("{} {}", name, TEST_COPY_SUFFIX);
    obj.insert("name".to_string(), Value::String(renamed));

    let mut replaced = Vec::new();
    if let Some(nodes) = obj.get_mut("nodes").and_then(Value::as_array_mut) {
        for node in nodes.iter_mut().filter_map(Value::as_object_mut) {
            if node.get("type").and_then(Value::as_str) != Some(WEBHOOK_NODE_TYPE) {
                continue;
            }
            let old_name = node
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string();
            node.insert("type".into(), json!(CHAT_TRIGGER_NODE_TYPE));
            node.insert("typeVersion".into(), json!(1.0));
            node.insert("name".into(), json!("Chat Trigger"));
            node.insert("parameters".into(), json!({ "options": {} }));
            replaced.push(old_name);
        }
    }
    replaced
}

/// Path of the test copy for `<dir>/<name>.json`
pub fn test_copy_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}{}.json", name, TEST_COPY_SUFFIX))
}

/// Read `<dir>/<name>.json`, convert it and write `<dir>/<name>_TestCopy.json`
pub fn create_test_copy(dir: &Path, name: &str) -> Result<TestCopy, WorkflowError> {
    let source = dir.join(format!("{}.json", name));
    let content = fs::read_to_string(&source).map_err(|e| WorkflowError::Read {
        path: source.clone(),
        source: e,
    })?;
    let mut workflow: Value = serde_json::from_str(&content).map_err(|e| WorkflowError::Json {
        path: source.clone(),
        source: e,
    })?;
    if !workflow.is_object() {
        return Err(WorkflowError::NotAnObject { path: source });
    }

    let replaced = convert_to_test_copy(&mut workflow);
    if replaced.is_empty() {
        tracing::warn!("no webhook node found in {}", name);
    }

    let target = test_copy_path(dir, name);
    let pretty = serde_json::to_string_pretty(&workflow).map_err(|e| WorkflowError::Json {
        path: target.clone(),
        source: e,
    })?;
    fs::write(&target, pretty).map_err(|e| WorkflowError::Write {
        path: target.clone(),
        source: e,
    })?;

    Ok(TestCopy { target, replaced })
}

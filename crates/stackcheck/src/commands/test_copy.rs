//! Test copy command: exit 0 only if every requested workflow was copied

use crate::console;
use anyhow::Result;
use stackcheck_common::workflow_copy::{create_test_copy, DEFAULT_WORKFLOWS};
use std::path::Path;

pub fn run(dir: &Path, names: &[String]) -> Result<i32> {
    let names: Vec<String> = if names.is_empty() {
        DEFAULT_WORKFLOWS.iter().map(|s| s.to_string()).collect()
    } else {
        names.to_vec()
    };

    console::banner("Creating TestCopy workflows with Chat Trigger");

    let mut copied = 0;
    for name in &names {
        console::info(&format!("Processing: {}", name));
        match create_test_copy(dir, name) {
            Ok(copy) => {
                if copy.replaced.is_empty() {
                    console::warn(&format!("No webhook node found in {}", name));
                }
                for node in &copy.replaced {
                    console::info(&format!("Replaced webhook node '{}' with Chat Trigger", node));
                }
                console::info(&format!("Created: {}", copy.target.display()));
                copied += 1;
            }
            Err(e) => console::error(&e.to_string()),
        }
    }

    console::rule();
    console::info(&format!("Created {}/{} test copies", copied, names.len()));

    Ok(if copied == names.len() { 0 } else { 1 })
}

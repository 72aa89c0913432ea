use crate::console;
use anyhow::Result;
use stackcheck_common::scaffold::{organize, scaffold, Relocation};
use std::path::Path;

/// Create the layout; with `tidy`, first file loose artifacts into it so the
/// placeholders never shadow a real file waiting to be moved.
pub fn run(root: &Path, tidy: bool) -> Result<i32> {
    if tidy {
        for relocation in organize(root)? {
            match relocation {
                Relocation::Moved { from, to } => {
                    console::info(&format!("MOVED: {} -> {}", from.display(), to.display()))
                }
                Relocation::Skipped { to, .. } => {
                    console::warn(&format!("SKIP (exists): {}", to.display()))
                }
            }
        }
    }

    let created = scaffold(root)?;
    if created.is_empty() {
        console::info("Layout already complete, nothing to create");
    }
    for path in &created {
        console::info(&format!("Created {}", path.display()));
    }
    Ok(0)
}

use crate::console;
use anyhow::Result;
use stackcheck_common::metrics::{load_strings, EvalMetrics};
use std::path::Path;

pub fn run(predictions: &Path, references: &Path, out: Option<&Path>) -> Result<i32> {
    let predictions = load_strings(predictions)?;
    let references = load_strings(references)?;
    if predictions.len() != references.len() {
        console::warn(&format!(
            "{} predictions vs {} references; extra entries are ignored",
            predictions.len(),
            references.len()
        ));
    }

    let metrics = EvalMetrics::compute(&predictions, &references);
    println!("{}", serde_json::to_string_pretty(&metrics)?);

    if let Some(path) = out {
        metrics.save(path)?;
        console::info(&format!("Saved metrics to {}", path.display()));
    }
    Ok(0)
}

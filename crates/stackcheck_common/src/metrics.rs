//! Evaluation metrics
//!
//! Exact-match accuracy and token-set F1 over prediction/reference pairs.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("failed to access {path}: {source}")]
    Io {
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
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvalMetrics {
    pub accuracy: f64,
    pub f1: f64,
}

impl EvalMetrics {
    pub fn compute(predictions: &[String], references: &[String]) -> Self {
        Self {
            accuracy: accuracy(predictions, references),
            f1: f1(predictions, references),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), MetricsError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| MetricsError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| MetricsError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Exact matches over zipped pairs, divided by the number of predictions
pub fn accuracy(predictions: &[String], references: &[String]) -> f64 {
    if predictions.is_empty() {
        return 0.0;
    }
    let correct = predictions
        .iter()
        .zip(references)
        .filter(|(p, r)| p == r)
        .count();
    correct as f64 / predictions.len() as f64
}

/// Mean token-set F1 over zipped pairs
pub fn f1(predictions: &[String], references: &[String]) -> f64 {
    let scores: Vec<f64> = predictions
        .iter()
        .zip(references)
        .map(|(p, r)| f1_pair(p, r))
        .collect();
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}

fn f1_pair(prediction: &str, reference: &str) -> f64 {
    let p: HashSet<&str> = prediction.split_whitespace().collect();
    let r: HashSet<&str> = reference.split_whitespace().collect();
    if p.is_empty() || r.is_empty() {
        return 0.0;
    }
    let tp = p.intersection(&r).count() as f64;
    let precision = tp / p.len() as f64;
    let recall = tp / r.len() as f64;
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// Load a JSON array of strings
pub fn load_strings(path: &Path) -> Result<Vec<String>, MetricsError> {
    let content = fs::read_to_string(path).map_err(|source| MetricsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| MetricsError::Json {
        path: path.to_path_buf(),
        source,
    })
}

//! Probe Trait Abstraction
//!
//! Every access path (psql, native driver, REST, native client) is a [`Probe`]:
//! one attempt that classifies its own errors into a [`ProbeResult`]. The
//! orchestrator owns sequencing and logging, so probes stay free of side
//! effects beyond the network or process call itself.
//!
//! Production code uses the probes in `database` and `cache`. Test code uses
//! [`FakeProbe`] with a canned result and a call counter.

use async_trait::async_trait;
use stackcheck_common::{CheckName, ProbeResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Liveness query shared by both database paths
pub const LIVENESS_QUERY: &str = "SELECT 1 as test;";

#[async_trait]
pub trait Probe: Send + Sync {
    /// Outcome-set key for this access path
    fn check(&self) -> CheckName;

    /// Human-readable name used in console and audit lines
    fn label(&self) -> &str;

    /// Make one attempt. Never panics, never returns an error.
    async fn attempt(&self) -> ProbeResult;
}

/// Primary and secondary access paths to one service
pub struct ServiceProbes {
    pub primary: Box<dyn Probe>,
    pub secondary: Box<dyn Probe>,
}

// ============================================================================
// Fake Probe (Testing)
// ============================================================================

/// Probe returning a fixed result, counting attempts
#[derive(Clone)]
pub struct FakeProbe {
    check: CheckName,
    label: String,
    result: ProbeResult,
    calls: Arc<AtomicUsize>,
}

impl FakeProbe {
    pub fn new(check: CheckName, result: ProbeResult) -> Self {
        Self {
            check,
            label: check.as_str().to_string(),
            result,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn ok(check: CheckName) -> Self {
        Self::new(check, ProbeResult::Success)
    }

    pub fn failing(check: CheckName, reason: &str) -> Self {
        Self::new(check, ProbeResult::failure(reason))
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    /// Shared counter; clone it before boxing the probe
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Probe for FakeProbe {
    fn check(&self) -> CheckName {
        self.check
    }

    fn label(&self) -> &str {
        &self.label
    }

    async fn attempt(&self) -> ProbeResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

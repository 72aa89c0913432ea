//! Verify Command
//!
//! Exit codes:
//! - 0: all applicable checks passed
//! - 1: at least one applicable check failed
//!
//! An unwritable audit log aborts with an error instead.

use crate::console;
use crate::orchestrator::Orchestrator;
use anyhow::{Context, Result};
use stackcheck_common::{EnvRecord, Settings};
use std::path::PathBuf;
use tracing::debug;

/// Options from the command line; `None` keeps the settings file's value
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    pub settings: PathBuf,
    pub env_file: Option<PathBuf>,
    pub init_script: Option<PathBuf>,
    pub audit_log: Option<PathBuf>,
}

/// Load settings, apply overrides and resolve connection targets
pub fn load_settings(opts: &VerifyOptions) -> Result<Settings> {
    let mut settings = Settings::load(&opts.settings)
        .with_context(|| format!("loading {}", opts.settings.display()))?;

    if let Some(path) = &opts.env_file {
        settings.paths.env_file = path.clone();
    }
    if let Some(path) = &opts.init_script {
        settings.paths.init_script = path.clone();
    }
    if let Some(path) = &opts.audit_log {
        settings.paths.audit_log = path.clone();
    }
    Ok(settings)
}

pub async fn run(opts: VerifyOptions) -> Result<i32> {
    let settings = load_settings(&opts)?;

    // A missing env file is reported by the env check itself; connection
    // targets then come from the settings file alone.
    let env = EnvRecord::load(&settings.paths.env_file).unwrap_or_else(|e| {
        debug!("env file unavailable for target resolution: {}", e);
        EnvRecord::default()
    });
    let config = settings.resolve(&env);

    console::banner("Stackcheck - Setup Verification");

    let orchestrator = Orchestrator::from_config(&config);
    let report = orchestrator
        .run()
        .await
        .context("cannot record this run")?;

    Ok(report.exit_code())
}

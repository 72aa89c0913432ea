//! Verification Orchestrator
//!
//! One forward pass, no retries:
//!
//! ```text
//! Init → EnvCheck → DbProbe → DbInit (conditional) → CacheProbe → Aggregate → Done
//! ```
//!
//! Invariants:
//! - EnvCheck never stops the run; the probes still execute
//! - DbInit runs only when a database probe succeeded; otherwise the script
//!   runner is never called and a skip line is written to the audit log
//! - Secondary paths whose dependency is missing are recorded as
//!   NotApplicable without calling the probe
//! - The only fatal error is failing to create the audit log

use crate::cache::{RedisClientProbe, RedisRestProbe};
use crate::capabilities::{Availability, Capabilities};
use crate::console;
use crate::database::{PgDriverProbe, PsqlProbe};
use crate::init_script::{PsqlScriptRunner, ScriptRunner};
use crate::probe::{Probe, ServiceProbes};
use stackcheck_common::env_file;
use stackcheck_common::{
    AuditError, AuditLog, CheckName, CheckOutcomeSet, ProbeResult, VerifyConfig, REQUIRED_KEYS,
};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const AUDIT_TITLE: &str = "Stackcheck - Setup Verification Log";

const DATABASE_CHECKS: [CheckName; 2] = [CheckName::PostgresPsql, CheckName::PostgresNative];

/// States of a verification run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    EnvCheck,
    DbProbe,
    DbInit,
    CacheProbe,
    Aggregate,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::EnvCheck => "env_check",
            Stage::DbProbe => "db_probe",
            Stage::DbInit => "db_init",
            Stage::CacheProbe => "cache_probe",
            Stage::Aggregate => "aggregate",
            Stage::Done => "done",
        };
        f.write_str(s)
    }
}

/// Files a run reads and writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub env_file: PathBuf,
    pub init_script: PathBuf,
    pub audit_log: PathBuf,
}

impl From<&VerifyConfig> for RunPaths {
    fn from(config: &VerifyConfig) -> Self {
        Self {
            env_file: config.env_file.clone(),
            init_script: config.init_script.clone(),
            audit_log: config.audit_log.clone(),
        }
    }
}

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcomes: CheckOutcomeSet,
    /// Stages entered, in order
    pub stages: Vec<Stage>,
    pub audit_log: PathBuf,
}

impl RunReport {
    pub fn verdict(&self) -> bool {
        self.outcomes.verdict()
    }

    pub fn exit_code(&self) -> i32 {
        self.outcomes.exit_code()
    }
}

pub struct Orchestrator {
    paths: RunPaths,
    required_keys: &'static [&'static str],
    database: ServiceProbes,
    cache: ServiceProbes,
    script_runner: Box<dyn ScriptRunner>,
    capabilities: Capabilities,
}

impl Orchestrator {
    /// Production wiring: real probes, capabilities of this build
    pub fn from_config(config: &VerifyConfig) -> Self {
        Self::with_capabilities(config, Capabilities::detect())
    }

    pub fn with_capabilities(config: &VerifyConfig, capabilities: Capabilities) -> Self {
        let database = ServiceProbes {
            primary: Box::new(PsqlProbe::new(config.postgres.clone(), config.psql_timeout)),
            secondary: Box::new(PgDriverProbe::new(
                config.postgres.clone(),
                config.psql_timeout,
            )),
        };
        let cache = ServiceProbes {
            primary: Box::new(RedisRestProbe::new(config.redis.clone(), config.rest_timeout)),
            secondary: Box::new(RedisClientProbe::new(
                config.redis.clone(),
                config.rest_timeout,
            )),
        };
        let runner = PsqlScriptRunner::new(config.postgres.clone(), config.script_timeout);

        Self::new(
            RunPaths::from(config),
            database,
            cache,
            Box::new(runner),
            capabilities,
        )
    }

    pub fn new(
        paths: RunPaths,
        database: ServiceProbes,
        cache: ServiceProbes,
        script_runner: Box<dyn ScriptRunner>,
        capabilities: Capabilities,
    ) -> Self {
        Self {
            paths,
            required_keys: &REQUIRED_KEYS,
            database,
            cache,
            script_runner,
            capabilities,
        }
    }

    pub fn with_required_keys(mut self, keys: &'static [&'static str]) -> Self {
        self.required_keys = keys;
        self
    }

    pub fn audit_path(&self) -> &Path {
        &self.paths.audit_log
    }

    /// Execute the full pass
    pub async fn run(&self) -> Result<RunReport, AuditError> {
        let mut run = Run::default();

        run.enter(Stage::Init);
        let audit = AuditLog::create(&self.paths.audit_log, AUDIT_TITLE)?;

        run.enter(Stage::EnvCheck);
        self.check_env(&audit, &mut run);

        run.enter(Stage::DbProbe);
        self.probe_service(&self.database, &self.capabilities.pg_driver, &audit, &mut run)
            .await;

        if run.outcomes.any_success(&DATABASE_CHECKS) {
            run.enter(Stage::DbInit);
            self.init_database(&audit, &mut run).await;
        } else {
            let reason = "no successful PostgreSQL connection";
            console::warn(&format!("Skipping SQL execution: {}", reason));
            audit.record(&format!("SQL execution: SKIPPED - {}", reason));
        }

        run.enter(Stage::CacheProbe);
        self.probe_service(&self.cache, &self.capabilities.redis_client, &audit, &mut run)
            .await;

        run.enter(Stage::Aggregate);
        let verdict = run.outcomes.verdict();
        let failed = run.outcomes.failed_checks();
        info!(verdict, failed = failed.len(), "verification finished");

        run.enter(Stage::Done);
        self.finish(&audit, verdict, &failed);

        Ok(RunReport {
            outcomes: run.outcomes,
            stages: run.stages,
            audit_log: audit.path().to_path_buf(),
        })
    }

    fn check_env(&self, audit: &AuditLog, run: &mut Run) {
        console::info(&format!(
            "Verifying environment file {}...",
            self.paths.env_file.display()
        ));
        let result = env_file::verify(self.required_keys, &self.paths.env_file);
        run.record(audit, CheckName::EnvFile, "Environment file", result);
    }

    async fn probe_service(
        &self,
        probes: &ServiceProbes,
        secondary_available: &Availability,
        audit: &AuditLog,
        run: &mut Run,
    ) {
        self.attempt(probes.primary.as_ref(), audit, run).await;

        match secondary_available {
            Availability::Available => self.attempt(probes.secondary.as_ref(), audit, run).await,
            Availability::Missing(reason) => run.record(
                audit,
                probes.secondary.check(),
                probes.secondary.label(),
                ProbeResult::not_applicable(reason.clone()),
            ),
        }
    }

    async fn attempt(&self, probe: &dyn Probe, audit: &AuditLog, run: &mut Run) {
        console::info(&format!("Testing {}...", probe.label()));
        let result = probe.attempt().await;
        run.record(audit, probe.check(), probe.label(), result);
    }

    async fn init_database(&self, audit: &AuditLog, run: &mut Run) {
        console::info(&format!(
            "Executing SQL from {}...",
            self.paths.init_script.display()
        ));
        let script = self.script_runner.run(&self.paths.init_script).await;
        if script.result.is_success() && !script.stdout.trim().is_empty() {
            println!("{}", script.stdout.trim_end());
        }
        run.record(audit, CheckName::SqlExecution, "SQL execution", script.result);
    }

    fn finish(&self, audit: &AuditLog, verdict: bool, failed: &[CheckName]) {
        console::rule();
        if verdict {
            console::info("Setup OK");
            audit.record("=== FINAL STATUS: Setup OK ===");
        } else {
            let names: Vec<&str> = failed.iter().map(CheckName::as_str).collect();
            console::error("Setup FAILED");
            println!("Failed checks: {}", names.join(", "));
            println!("Check {} for details", audit.path().display());
            audit.record(&format!(
                "=== FINAL STATUS: Setup FAILED - {} ===",
                names.join(", ")
            ));
        }
    }
}

#[derive(Default)]
struct Run {
    outcomes: CheckOutcomeSet,
    stages: Vec<Stage>,
}

impl Run {
    fn enter(&mut self, stage: Stage) {
        debug!(%stage, "entering stage");
        self.stages.push(stage);
    }

    /// Report one outcome on the console and in the audit log, then store it
    fn record(&mut self, audit: &AuditLog, check: CheckName, label: &str, result: ProbeResult) {
        match &result {
            ProbeResult::Success => {
                console::info(&format!("{}: OK", label));
                audit.record(&format!("{}: SUCCESS", label));
            }
            ProbeResult::Failure(reason) => {
                console::error(&format!("{} failed: {}", label, reason));
                audit.record(&format!("{}: FAILED - {}", label, reason));
            }
            ProbeResult::NotApplicable(reason) => {
                console::warn(&format!("{} skipped: {}", label, reason));
                info!(check = %check, %reason, "access path not applicable");
            }
        }

        if let Err(e) = self.outcomes.record(check, result) {
            warn!("{}", e);
        }
    }
}

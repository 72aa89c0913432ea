//! Stackcheck Common - shared types for the stackcheck tooling
//!
//! Outcome model, env file checks, audit log, settings, and the small project
//! helpers (scaffolding, workflow test copies, evaluation metrics).

pub mod audit_log;
pub mod env_file;
pub mod metrics;
pub mod outcome;
pub mod scaffold;
pub mod settings;
pub mod workflow_copy;

pub use audit_log::{AuditError, AuditLog};
pub use env_file::{EnvFileError, EnvRecord, REQUIRED_KEYS};
pub use outcome::{CheckError, CheckName, CheckOutcomeSet, DuplicateCheck, ProbeResult};
pub use settings::{ConfigError, PostgresTarget, RedisTarget, Secret, Settings, VerifyConfig};

//! Stackcheck library - exposes modules for testing

pub mod cache;
pub mod capabilities;
pub mod commands;
pub mod console;
pub mod database;
pub mod init_script;
pub mod orchestrator;
pub mod probe;

pub use capabilities::{Availability, Capabilities};
pub use init_script::{FakeScriptRunner, ScriptRun, ScriptRunner};
pub use orchestrator::{Orchestrator, RunPaths, RunReport, Stage};
pub use probe::{FakeProbe, Probe, ServiceProbes};

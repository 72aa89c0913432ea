//! Command modules for stackcheck
//!
//! - verify: environment and connectivity verification
//! - scaffold: project directory layout
//! - test_copy: chat-trigger test copies of workflows
//! - evaluate: accuracy/F1 over prediction files
//!
//! Each command returns the process exit code.

pub mod evaluate;
pub mod scaffold;
pub mod test_copy;
pub mod verify;

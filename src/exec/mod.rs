// src/exec/mod.rs

//! Process launching layer.
//!
//! - [`command`] spawns commands through the platform shell.
//! - [`script`] writes commands to temporary bash scripts and runs them,
//!   optionally behind a launcher prefix such as `wsl -e`.
//! - [`backend`] provides the `StepLauncher` trait used by the pipeline
//!   runner, and the `RealStepLauncher` used in production.

pub mod backend;
pub mod command;
pub mod script;

pub use backend::{RealStepLauncher, StepLauncher};
pub use command::{shell_command, spawn_shell};
pub use script::{ScriptProcess, script_command, spawn_script, write_script};

// src/pipeline/mod.rs

//! Config-driven sequences of tool invocations.
//!
//! - [`graph`] orders steps by their `after` dependencies.
//! - [`runner`] executes steps one after another through the output
//!   coordinator.

pub mod graph;
pub mod runner;

pub use graph::StepGraph;
pub use runner::{PipelineReport, StepOutcome, StepReport, run_pipeline};

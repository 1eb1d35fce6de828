// src/config/mod.rs

//! Pipeline configuration.
//!
//! - `model.rs`: the TOML-backed data model.
//! - `loader.rs`: reading a pipeline file from disk.
//! - `validate.rs`: turning a raw file into a validated [`PipelineFile`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigSection, PipelineFile, RawPipelineFile, StepConfig};

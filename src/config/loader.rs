// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{PipelineFile, RawPipelineFile};
use crate::errors::Result;

/// Load a pipeline file and return the raw, unvalidated contents.
///
/// Use [`load_and_validate`] unless you need to inspect an invalid file.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawPipelineFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let raw: RawPipelineFile = toml::from_str(&contents)?;
    Ok(raw)
}

/// Load a pipeline file and validate it:
///
/// - at least one step, each with a non-empty `cmd`,
/// - `[config].batch_size >= 1`,
/// - no unknown or self-referencing `after` entries,
/// - no dependency cycles.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PipelineFile> {
    let raw = load_from_path(&path)?;
    PipelineFile::try_from(raw)
}

/// `Toolstream.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Toolstream.toml")
}

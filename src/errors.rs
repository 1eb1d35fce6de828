// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::sink::SinkError;

#[derive(Error, Debug)]
pub enum ToolstreamError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cycle detected in pipeline: {0}")]
    DependencyCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ToolstreamError>;

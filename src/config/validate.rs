// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{PipelineFile, RawPipelineFile};
use crate::errors::{Result, ToolstreamError};

impl TryFrom<RawPipelineFile> for PipelineFile {
    type Error = ToolstreamError;

    fn try_from(raw: RawPipelineFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(PipelineFile::new_unchecked(raw.config, raw.step))
    }
}

fn validate_raw_config(cfg: &RawPipelineFile) -> Result<()> {
    ensure_has_steps(cfg)?;
    validate_global_config(cfg)?;
    validate_step_commands(cfg)?;
    validate_step_dependencies(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_steps(cfg: &RawPipelineFile) -> Result<()> {
    if cfg.step.is_empty() {
        return Err(ToolstreamError::ConfigError(
            "pipeline must contain at least one [step.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawPipelineFile) -> Result<()> {
    if cfg.config.batch_size == 0 {
        return Err(ToolstreamError::ConfigError(
            "[config].batch_size must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.config.launcher.iter().any(|w| w.trim().is_empty()) {
        return Err(ToolstreamError::ConfigError(
            "[config].launcher must not contain empty entries".to_string(),
        ));
    }
    Ok(())
}

fn validate_step_commands(cfg: &RawPipelineFile) -> Result<()> {
    for (name, step) in cfg.step.iter() {
        if step.cmd.trim().is_empty() {
            return Err(ToolstreamError::ConfigError(format!(
                "step '{}' has an empty `cmd`",
                name
            )));
        }
    }
    Ok(())
}

fn validate_step_dependencies(cfg: &RawPipelineFile) -> Result<()> {
    for (name, step) in cfg.step.iter() {
        for dep in step.after.iter() {
            if dep == name {
                return Err(ToolstreamError::ConfigError(format!(
                    "step '{}' cannot depend on itself in `after`",
                    name
                )));
            }
            if !cfg.step.contains_key(dep) {
                return Err(ToolstreamError::ConfigError(format!(
                    "step '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawPipelineFile) -> Result<()> {
    // Edge direction: dep -> step.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.step.keys() {
        graph.add_node(name.as_str());
    }

    for (name, step) in cfg.step.iter() {
        for dep in step.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(ToolstreamError::DependencyCycle(format!(
            "cycle detected in step dependencies involving step '{}'",
            cycle.node_id()
        ))),
    }
}

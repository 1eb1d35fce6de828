// src/pipeline/graph.rs

use std::collections::{BTreeMap, BTreeSet};

use crate::config::PipelineFile;

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct StepNode {
    deps: Vec<String>,
    dependents: Vec<String>,
}

/// Dependency graph of pipeline steps, keyed by step name.
///
/// Acyclicity is already checked when the [`PipelineFile`] is validated, so
/// this only keeps adjacency information for ordering and skipping.
#[derive(Debug, Clone)]
pub struct StepGraph {
    nodes: BTreeMap<String, StepNode>,
}

impl StepGraph {
    pub fn from_pipeline(pipeline: &PipelineFile) -> Self {
        let mut nodes: BTreeMap<String, StepNode> = pipeline
            .step
            .iter()
            .map(|(name, step)| {
                (
                    name.clone(),
                    StepNode {
                        deps: step.after.clone(),
                        dependents: Vec::new(),
                    },
                )
            })
            .collect();

        for (name, step) in pipeline.step.iter() {
            for dep in step.after.iter() {
                if let Some(dep_node) = nodes.get_mut(dep) {
                    dep_node.dependents.push(name.clone());
                }
            }
        }

        Self { nodes }
    }

    /// All step names, sorted.
    pub fn steps(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    /// Immediate dependencies of a step (its `after` list).
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Steps that list `name` in their `after`.
    pub fn dependents_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Topological order; among steps that are ready at the same time, the
    /// alphabetically smallest name goes first.
    pub fn execution_order(&self) -> Vec<String> {
        let mut remaining: BTreeMap<&str, usize> = self
            .nodes
            .iter()
            .map(|(name, node)| (name.as_str(), node.deps.len()))
            .collect();

        let mut ready: BTreeSet<&str> = remaining
            .iter()
            .filter(|(_, deps)| **deps == 0)
            .map(|(name, _)| *name)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(name) = ready.pop_first() {
            remaining.remove(name);
            order.push(name.to_string());

            for dependent in self.dependents_of(name) {
                if let Some(count) = remaining.get_mut(dependent.as_str()) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(dependent.as_str());
                    }
                }
            }
        }

        order
    }
}

//! Dependency tracing.
//!
//! A trace expands one target into its precomputed relation list from the
//! descriptor and groups the result like the main tree. Upstream traces end
//! with the traced target; downstream traces start with it.

use crate::dependency::{DependencyFile, Relation};
use crate::forest::{self, Forest};
use crate::run_dir::RunDirectory;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceDirection {
    Up,
    Down,
}

impl TraceDirection {
    pub fn relation(self) -> Relation {
        match self {
            TraceDirection::Up => Relation::Upstream,
            TraceDirection::Down => Relation::Downstream,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TraceDirection::Up => "up",
            TraceDirection::Down => "down",
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            TraceDirection::Up => "↑",
            TraceDirection::Down => "↓",
        }
    }
}

impl fmt::Display for TraceDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Ordered target list of a trace, or empty when the target has no relations.
pub fn trace_targets(deps: &DependencyFile, target: &str, direction: TraceDirection) -> Vec<String> {
    let mut related: Vec<String> = deps
        .related(target, direction.relation())
        .into_iter()
        .filter(|t| t != target)
        .collect();
    if related.is_empty() {
        return related;
    }

    let mut seen = std::collections::HashSet::new();
    related.retain(|t| seen.insert(t.clone()));

    match direction {
        TraceDirection::Up => related.push(target.to_string()),
        TraceDirection::Down => related.insert(0, target.to_string()),
    }
    related
}

/// Build the forest of a trace. Returns `None` when there is nothing to show.
pub fn trace(
    deps: &DependencyFile,
    run: &RunDirectory,
    target: &str,
    direction: TraceDirection,
) -> Option<Forest> {
    let names = trace_targets(deps, target, direction);
    if names.is_empty() {
        tracing::debug!(target_name = target, %direction, "no relations to trace");
        return None;
    }
    Some(forest::build_from_names(deps, run, &names))
}

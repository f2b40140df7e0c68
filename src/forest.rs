//! Level-partitioned target forest.
//!
//! Targets are grouped by level-key. Groups keep the order in which their
//! level-key was first seen while walking the target list, and members keep
//! target-list order. The first member of a group is promoted to the group
//! row; the remaining members hang below it as children.

use crate::dependency::DependencyFile;
use crate::run_dir::{RunDirectory, TargetProbe};
use crate::status::{TargetStatus, Timestamps};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Groups with at most this many targets start out expanded.
pub const DEFAULT_EXPAND_LIMIT: usize = 3;

/// A target row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub name: String,
    pub level: String,
    pub status: TargetStatus,
    pub start_time: String,
    pub end_time: String,
}

impl Target {
    pub fn new(name: impl Into<String>, level: impl Into<String>, probe: TargetProbe) -> Self {
        Self {
            name: name.into(),
            level: level.into(),
            status: probe.status,
            start_time: probe.timestamps.start,
            end_time: probe.timestamps.end,
        }
    }

    pub fn timestamps(&self) -> Timestamps {
        Timestamps {
            start: self.start_time.clone(),
            end: self.end_time.clone(),
        }
    }
}

/// All targets sharing one level-key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelGroup {
    pub level: String,
    pub targets: Vec<Target>,
}

impl LevelGroup {
    /// Expansion state used when no saved view state covers this level.
    pub fn default_expanded(&self) -> bool {
        self.targets.len() <= DEFAULT_EXPAND_LIMIT
    }

    /// Whether the group row can be expanded at all. A lone target has
    /// nothing to reveal.
    pub fn is_expandable(&self) -> bool {
        self.targets.len() > 1
    }

    /// The promoted target occupying the group row.
    pub fn head(&self) -> Option<&Target> {
        self.targets.first()
    }

    pub fn children(&self) -> &[Target] {
        self.targets.get(1..).unwrap_or_default()
    }
}

/// Position of a target inside a [`Forest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetIndex {
    pub group: usize,
    pub member: usize,
}

/// Ordered level groups plus lookup indices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Forest {
    groups: Vec<LevelGroup>,
    #[serde(skip)]
    level_index: HashMap<String, usize>,
    #[serde(skip)]
    target_index: HashMap<String, TargetIndex>,
}

impl Forest {
    /// Group already-resolved targets. Duplicate names keep the first occurrence.
    pub fn from_targets(targets: impl IntoIterator<Item = Target>) -> Self {
        let mut groups: Vec<LevelGroup> = Vec::new();
        let mut level_index: HashMap<String, usize> = HashMap::new();
        let mut target_index = HashMap::new();

        for target in targets {
            if target_index.contains_key(&target.name) {
                continue;
            }
            let group = *level_index.entry(target.level.clone()).or_insert_with(|| {
                groups.push(LevelGroup {
                    level: target.level.clone(),
                    targets: Vec::new(),
                });
                groups.len() - 1
            });
            let member = groups[group].targets.len();
            target_index.insert(target.name.clone(), TargetIndex { group, member });
            groups[group].targets.push(target);
        }

        Self {
            groups,
            level_index,
            target_index,
        }
    }

    pub fn groups(&self) -> &[LevelGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn target_count(&self) -> usize {
        self.target_index.len()
    }

    pub fn group(&self, level: &str) -> Option<&LevelGroup> {
        self.level_index.get(level).map(|&i| &self.groups[i])
    }

    pub fn has_level(&self, level: &str) -> bool {
        self.level_index.contains_key(level)
    }

    pub fn index_of(&self, name: &str) -> Option<TargetIndex> {
        self.target_index.get(name).copied()
    }

    pub fn target(&self, name: &str) -> Option<&Target> {
        self.index_of(name).map(|i| self.at(i))
    }

    pub fn target_mut(&mut self, name: &str) -> Option<&mut Target> {
        let i = self.index_of(name)?;
        Some(&mut self.groups[i.group].targets[i.member])
    }

    pub fn at(&self, index: TargetIndex) -> &Target {
        &self.groups[index.group].targets[index.member]
    }

    /// Targets in display order.
    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.groups.iter().flat_map(|g| g.targets.iter())
    }

    pub fn targets_mut(&mut self) -> impl Iterator<Item = &mut Target> {
        self.groups.iter_mut().flat_map(|g| g.targets.iter_mut())
    }

    /// Level-keys in display order.
    pub fn levels(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.level.as_str()).collect()
    }

    /// Target names grouped by level-key, in display order.
    pub fn layout(&self) -> Vec<(String, Vec<String>)> {
        self.groups
            .iter()
            .map(|g| {
                (
                    g.level.clone(),
                    g.targets.iter().map(|t| t.name.clone()).collect(),
                )
            })
            .collect()
    }

    /// Names of every target, for membership checks.
    pub fn names(&self) -> HashSet<&str> {
        self.target_index.keys().map(String::as_str).collect()
    }
}

/// Resolve level and probe state for each name and group the result.
pub fn build_from_names(deps: &DependencyFile, run: &RunDirectory, names: &[String]) -> Forest {
    Forest::from_targets(
        names
            .iter()
            .map(|name| Target::new(name.clone(), deps.level_of(name), run.probe(name))),
    )
}

/// Build the forest of a run's active targets.
///
/// A missing or unreadable descriptor yields an empty forest.
pub fn build(run: &RunDirectory) -> Forest {
    match run.dependencies() {
        Ok(deps) => build_from_names(&deps, run, &deps.active_targets()),
        Err(e) => {
            tracing::info!(run = %run.root().display(), error = %e, "no targets to show");
            Forest::default()
        }
    }
}

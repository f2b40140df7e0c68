//! Dependency descriptor parsing.
//!
//! The flow tool writes `.target_dependency.csh` into every run directory.
//! It is a csh script made of `set NAME = "value value ..."` assignments.
//! Only a handful of variable families matter here:
//!
//! - `ACTIVE_TARGETS` - ordered list of the run's targets
//! - `TARGET_LEVEL_{target}` - level tokens, concatenated into a level-key
//! - `ALL_RELATED_{target}` - upstream related targets
//! - `DEPENDENCY_OUT_{target}` - downstream related targets
//!
//! Every assignment in the file is scanned once and kept in a map, so
//! per-target lookups are cheap no matter how many targets the run has.

use crate::error::{Result, XMetaError};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Variable holding the ordered list of active targets.
pub const ACTIVE_TARGETS_VAR: &str = "ACTIVE_TARGETS";

/// Level-key used for targets without a usable `TARGET_LEVEL_{target}` entry.
pub const FALLBACK_LEVEL: &str = "0";

/// Matches the head of an assignment, `set NAME =`, at the start of a line.
/// The value is everything up to the next head, so a broken quote never
/// runs into the following assignment.
fn assignment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*set[ \t]+([A-Za-z_][A-Za-z0-9_.\-]*)[ \t]*=[ \t]*")
            .expect("assignment regex is valid")
    })
}

/// Interpret the text following `set NAME =`.
///
/// A value opening with a quote must close with the same quote, possibly on
/// a later line. Anything else keeps its first line verbatim.
fn parse_value(body: &str) -> Assignment {
    let first_line = || body.lines().next().unwrap_or_default().trim().to_string();
    let Some(quote) = body.chars().next().filter(|c| *c == '"' || *c == '\'') else {
        return Assignment::Malformed(first_line());
    };
    match body[1..].find(quote) {
        Some(end) => Assignment::Quoted(
            body[1..=end]
                .split_whitespace()
                .map(String::from)
                .collect(),
        ),
        None => Assignment::Malformed(first_line()),
    }
}

/// The value side of a single `set` assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    /// A value wrapped in one matching pair of quotes, already split on whitespace.
    Quoted(Vec<String>),
    /// A value whose quoting could not be stripped safely. Kept verbatim, never split.
    Malformed(String),
}

/// Direction of a dependency relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// Ancestors (`ALL_RELATED_{target}`).
    Upstream,
    /// Descendants (`DEPENDENCY_OUT_{target}`).
    Downstream,
}

impl Relation {
    fn variable(self, target: &str) -> String {
        match self {
            Relation::Upstream => format!("ALL_RELATED_{}", target),
            Relation::Downstream => format!("DEPENDENCY_OUT_{}", target),
        }
    }
}

/// A parsed dependency descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyFile {
    assignments: HashMap<String, Assignment>,
}

/// Flattened view of everything the forest builder needs from a descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDependencies {
    pub active_targets: Vec<String>,
    pub level_of: HashMap<String, String>,
    pub related_up: HashMap<String, Vec<String>>,
    pub related_down: HashMap<String, Vec<String>>,
}

impl DependencyFile {
    /// Read and parse a descriptor from disk.
    ///
    /// # Errors
    ///
    /// Returns [`XMetaError::SourceUnavailable`] when the file is missing or
    /// unreadable. Callers treat that as a run with no targets.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            tracing::debug!(path = %path.display(), error = %e, "dependency descriptor unreadable");
            XMetaError::SourceUnavailable(path.to_path_buf())
        })?;
        Ok(Self::parse(&content))
    }

    /// Parse descriptor text. Never fails: unusable assignments are kept as
    /// [`Assignment::Malformed`] and read back as empty lists.
    pub fn parse(content: &str) -> Self {
        let mut assignments = HashMap::new();

        let heads: Vec<_> = assignment_regex().captures_iter(content).collect();

        for (i, caps) in heads.iter().enumerate() {
            let (Some(head), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let end = heads
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(content.len(), |m| m.start());
            let value = parse_value(&content[head.end()..end]);
            // First definition wins.
            assignments.entry(name.as_str().to_string()).or_insert(value);
        }

        Self { assignments }
    }

    /// Raw assignment lookup.
    pub fn assignment(&self, name: &str) -> Option<&Assignment> {
        self.assignments.get(name)
    }

    /// Whitespace-split values of a variable.
    ///
    /// Missing, empty and malformed variables all yield an empty list.
    pub fn values(&self, name: &str) -> Vec<String> {
        self.try_values(name).unwrap_or_default()
    }

    /// Like [`values`](Self::values) but reports a malformed assignment.
    pub fn try_values(&self, name: &str) -> Result<Vec<String>> {
        match self.assignments.get(name) {
            Some(Assignment::Quoted(values)) => Ok(values.clone()),
            Some(Assignment::Malformed(raw)) => {
                tracing::debug!(variable = name, raw = %raw, "skipping malformed assignment");
                Err(XMetaError::MalformedAssignment(name.to_string()))
            }
            None => Ok(Vec::new()),
        }
    }

    /// Ordered active targets, duplicates removed (first occurrence wins).
    pub fn active_targets(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.values(ACTIVE_TARGETS_VAR)
            .into_iter()
            .filter(|t| seen.insert(t.clone()))
            .collect()
    }

    /// Level-key of a target: its level tokens concatenated without separator,
    /// or [`FALLBACK_LEVEL`] when the target has none.
    pub fn level_of(&self, target: &str) -> String {
        let tokens = self.values(&format!("TARGET_LEVEL_{}", target));
        if tokens.is_empty() {
            FALLBACK_LEVEL.to_string()
        } else {
            tokens.concat()
        }
    }

    /// Related targets of one target in the given direction.
    ///
    /// An empty list is a normal outcome: the target stands alone.
    pub fn related(&self, target: &str, relation: Relation) -> Vec<String> {
        self.values(&relation.variable(target))
    }

    pub fn related_up(&self, target: &str) -> Vec<String> {
        self.related(target, Relation::Upstream)
    }

    pub fn related_down(&self, target: &str) -> Vec<String> {
        self.related(target, Relation::Downstream)
    }

    /// Resolve levels and relations for every active target.
    pub fn summarize(&self) -> ParsedDependencies {
        let active_targets = self.active_targets();
        let mut parsed = ParsedDependencies::default();
        for target in &active_targets {
            parsed
                .level_of
                .insert(target.clone(), self.level_of(target));
            parsed
                .related_up
                .insert(target.clone(), self.related_up(target));
            parsed
                .related_down
                .insert(target.clone(), self.related_down(target));
        }
        parsed.active_targets = active_targets;
        parsed
    }
}

/// Parse a descriptor file into its flattened form.
pub fn parse(path: &Path) -> Result<ParsedDependencies> {
    Ok(DependencyFile::load(path)?.summarize())
}

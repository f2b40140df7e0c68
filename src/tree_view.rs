//! Tree view over a forest: expansion, selection, cursor and scroll.
//!
//! Every view is bound to one run directory and knows how to rebuild its own
//! forest, so polling and actions never read a shared "current run".

use crate::forest::{self, Forest, Target, TargetIndex};
use crate::reconcile::{self, RowUpdate};
use crate::run_dir::RunDirectory;
use crate::trace::{self, TraceDirection};
use crate::view_state::ViewState;
use std::collections::{HashMap, HashSet};

/// Where a view's forest comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForestSource {
    /// All active targets of the run.
    Active,
    /// Trace of one target.
    Trace {
        target: String,
        direction: TraceDirection,
    },
}

/// Identity of a target row that survives rebuilds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowKey {
    pub level: String,
    pub target: String,
}

impl RowKey {
    pub fn of(target: &Target) -> Self {
        Self {
            level: target.level.clone(),
            target: target.name.clone(),
        }
    }
}

/// A row currently visible in the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleRow {
    pub index: TargetIndex,
    /// The promoted first target occupying the group row.
    pub is_group_row: bool,
}

#[derive(Debug, Clone)]
pub struct TreeView {
    run: RunDirectory,
    source: ForestSource,
    forest: Forest,
    pub(crate) expanded: HashMap<String, bool>,
    pub(crate) selected: HashSet<RowKey>,
    pub(crate) selected_levels: HashSet<String>,
    cursor: usize,
    scroll: usize,
}

impl TreeView {
    /// Wrap a forest, applying default expansion and then any saved state.
    pub fn new(
        run: RunDirectory,
        source: ForestSource,
        forest: Forest,
        saved: Option<&ViewState>,
    ) -> Self {
        let mut view = Self {
            run,
            source,
            forest,
            expanded: HashMap::new(),
            selected: HashSet::new(),
            selected_levels: HashSet::new(),
            cursor: 0,
            scroll: 0,
        };
        view.reset_expansion();
        if let Some(state) = saved {
            state.apply(&mut view);
        }
        view
    }

    /// View of all active targets of a run.
    pub fn active(run: RunDirectory, saved: Option<&ViewState>) -> Self {
        let forest = forest::build(&run);
        Self::new(run, ForestSource::Active, forest, saved)
    }

    /// View of a trace, or `None` when the target has no relations.
    pub fn trace(run: RunDirectory, target: &str, direction: TraceDirection) -> Option<Self> {
        let deps = match run.dependencies() {
            Ok(deps) => deps,
            Err(e) => {
                tracing::warn!(error = %e, "cannot trace without a dependency descriptor");
                return None;
            }
        };
        let forest = trace::trace(&deps, &run, target, direction)?;
        let source = ForestSource::Trace {
            target: target.to_string(),
            direction,
        };
        Some(Self::new(run, source, forest, None))
    }

    pub fn run(&self) -> &RunDirectory {
        &self.run
    }

    pub fn source(&self) -> &ForestSource {
        &self.source
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    /// Tab title for this view.
    pub fn title(&self) -> String {
        match &self.source {
            ForestSource::Active => self.run.name(),
            ForestSource::Trace { target, direction } => {
                format!("{} {}", direction.arrow(), target)
            }
        }
    }

    fn reset_expansion(&mut self) {
        self.expanded = self
            .forest
            .groups()
            .iter()
            .map(|g| (g.level.clone(), g.default_expanded()))
            .collect();
    }

    // ------------------------------------------------------------------
    // Rows
    // ------------------------------------------------------------------

    pub fn is_expanded(&self, level: &str) -> bool {
        self.expanded.get(level).copied().unwrap_or(false)
    }

    /// Rows in display order, honoring collapsed groups.
    pub fn visible_rows(&self) -> Vec<VisibleRow> {
        let mut rows = Vec::with_capacity(self.forest.target_count());
        for (g, group) in self.forest.groups().iter().enumerate() {
            let shown = if self.is_expanded(&group.level) {
                group.targets.len()
            } else {
                group.targets.len().min(1)
            };
            for member in 0..shown {
                rows.push(VisibleRow {
                    index: TargetIndex { group: g, member },
                    is_group_row: member == 0,
                });
            }
        }
        rows
    }

    pub fn row_count(&self) -> usize {
        self.visible_rows().len()
    }

    /// Row position of a target key among visible rows.
    pub fn row_of(&self, key: &RowKey) -> Option<usize> {
        let index = self.forest.index_of(&key.target)?;
        if self.forest.at(index).level != key.level {
            return None;
        }
        self.visible_rows().iter().position(|r| r.index == index)
    }

    // ------------------------------------------------------------------
    // Cursor and scroll
    // ------------------------------------------------------------------

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn cursor_row(&self) -> Option<VisibleRow> {
        self.visible_rows().get(self.cursor).copied()
    }

    pub fn cursor_target(&self) -> Option<&Target> {
        self.cursor_row().map(|r| self.forest.at(r.index))
    }

    pub fn cursor_key(&self) -> Option<RowKey> {
        self.cursor_target().map(RowKey::of)
    }

    pub fn set_cursor(&mut self, row: usize) {
        self.cursor = row.min(self.row_count().saturating_sub(1));
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let target = self.cursor.saturating_add_signed(delta);
        self.set_cursor(target);
    }

    pub fn cursor_to_end(&mut self) {
        self.set_cursor(usize::MAX);
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn set_scroll(&mut self, offset: usize) {
        self.scroll = offset.min(self.row_count().saturating_sub(1));
    }

    /// Adjust scroll so the cursor stays inside a viewport of `height` rows.
    pub fn ensure_cursor_visible(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        if self.cursor < self.scroll {
            self.scroll = self.cursor;
        } else if self.cursor >= self.scroll + height {
            self.scroll = self.cursor + 1 - height;
        }
    }

    // ------------------------------------------------------------------
    // Expansion
    // ------------------------------------------------------------------

    pub fn set_expanded(&mut self, level: &str, expanded: bool) {
        if !self.forest.has_level(level) {
            return;
        }
        let cursor_key = self.cursor_key();
        self.expanded.insert(level.to_string(), expanded);
        self.restore_cursor(cursor_key.as_ref());
    }

    pub fn toggle_expanded(&mut self, level: &str) {
        let expanded = self.is_expanded(level);
        self.set_expanded(level, !expanded);
    }

    /// Toggle the group under the cursor.
    pub fn toggle_cursor_group(&mut self) {
        if let Some(group) = self.cursor_group() {
            self.toggle_expanded(&group);
        }
    }

    fn cursor_group(&self) -> Option<String> {
        let row = self.cursor_row()?;
        let group = &self.forest.groups()[row.index.group];
        group.is_expandable().then(|| group.level.clone())
    }

    /// Put the cursor back on `key`, or on its group row if the key got
    /// hidden, or clamp.
    pub(crate) fn restore_cursor(&mut self, key: Option<&RowKey>) {
        let Some(key) = key else {
            self.set_cursor(self.cursor);
            return;
        };
        if let Some(row) = self.row_of(key) {
            self.cursor = row;
            return;
        }
        let head = self
            .forest
            .group(&key.level)
            .and_then(|g| g.head())
            .map(RowKey::of);
        match head.and_then(|h| self.row_of(&h)) {
            Some(row) => self.cursor = row,
            None => self.set_cursor(self.cursor),
        }
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    pub fn is_selected(&self, target: &Target) -> bool {
        self.selected_levels.contains(&target.level) || self.selected.contains(&RowKey::of(target))
    }

    pub fn toggle_cursor_selection(&mut self) {
        if let Some(key) = self.cursor_key() {
            if !self.selected.remove(&key) {
                self.selected.insert(key);
            }
        }
    }

    /// Select or deselect the whole level group under the cursor.
    pub fn toggle_cursor_level_selection(&mut self) {
        if let Some(key) = self.cursor_key() {
            if !self.selected_levels.remove(&key.level) {
                self.selected_levels.insert(key.level);
            }
        }
    }

    pub fn select_target(&mut self, name: &str) {
        if let Some(target) = self.forest.target(name) {
            self.selected.insert(RowKey::of(target));
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
        self.selected_levels.clear();
    }

    pub fn has_selection(&self) -> bool {
        !self.selected.is_empty() || !self.selected_levels.is_empty()
    }

    /// Selected target names in display order.
    pub fn selected_targets(&self) -> Vec<String> {
        self.forest
            .targets()
            .filter(|t| self.is_selected(t))
            .map(|t| t.name.clone())
            .collect()
    }

    /// Targets an action should apply to: the selection, or the cursor
    /// target when nothing is selected.
    pub fn action_targets(&self) -> Vec<String> {
        if self.has_selection() {
            self.selected_targets()
        } else {
            self.cursor_target()
                .map(|t| vec![t.name.clone()])
                .unwrap_or_default()
        }
    }

    // ------------------------------------------------------------------
    // Refresh
    // ------------------------------------------------------------------

    /// Reconcile every row against the bound run directory.
    pub fn tick(&mut self) -> Vec<RowUpdate> {
        reconcile::tick(&mut self.forest, &self.run)
    }

    /// Reconcile only the named targets.
    pub fn refresh_targets(&mut self, names: &[String]) -> Vec<RowUpdate> {
        reconcile::refresh_targets(&mut self.forest, &self.run, names)
    }

    /// Rebuild the forest from its source, keeping expansion, selection,
    /// cursor and scroll.
    pub fn rebuild(&mut self) {
        let state = ViewState::capture(self);
        self.forest = match &self.source {
            ForestSource::Active => forest::build(&self.run),
            ForestSource::Trace { target, direction } => self
                .run
                .dependencies()
                .ok()
                .and_then(|deps| trace::trace(&deps, &self.run, target, *direction))
                .unwrap_or_default(),
        };
        self.selected.clear();
        self.selected_levels.clear();
        self.reset_expansion();
        state.apply(self);
    }

    /// Rebind the view to another run, rebuilding from scratch.
    pub fn rebind(&mut self, run: RunDirectory, saved: Option<&ViewState>) {
        *self = match &self.source {
            ForestSource::Active => Self::active(run, saved),
            ForestSource::Trace { target, direction } => {
                let source = self.source.clone();
                let forest = run
                    .dependencies()
                    .ok()
                    .and_then(|deps| trace::trace(&deps, &run, target, *direction))
                    .unwrap_or_default();
                Self::new(run, source, forest, saved)
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::TargetStatus;
    use crate::test_utils::{RunFixture, THREE_TARGETS};

    const FIVE_IN_ONE: &str = r#"set ACTIVE_TARGETS = "a b c d e z"
set TARGET_LEVEL_a = "1"
set TARGET_LEVEL_b = "1"
set TARGET_LEVEL_c = "1"
set TARGET_LEVEL_d = "1"
set TARGET_LEVEL_e = "1"
set TARGET_LEVEL_z = "2"
"#;

    fn names(view: &TreeView) -> Vec<String> {
        view.visible_rows()
            .iter()
            .map(|r| view.forest().at(r.index).name.clone())
            .collect()
    }

    #[test]
    fn test_small_groups_start_expanded() {
        let fx = RunFixture::new(THREE_TARGETS);
        let view = TreeView::active(fx.run(), None);
        assert!(view.is_expanded("1"));
        assert!(view.is_expanded("2"));
        assert_eq!(names(&view), vec!["t1", "t2", "t3"]);
    }

    #[test]
    fn test_large_group_starts_collapsed() {
        let fx = RunFixture::new(FIVE_IN_ONE);
        let view = TreeView::active(fx.run(), None);
        assert!(!view.is_expanded("1"));
        assert_eq!(names(&view), vec!["a", "z"]);
        assert!(view.visible_rows()[0].is_group_row);
    }

    #[test]
    fn test_toggle_cursor_group() {
        let fx = RunFixture::new(FIVE_IN_ONE);
        let mut view = TreeView::active(fx.run(), None);
        view.toggle_cursor_group();
        assert_eq!(names(&view), vec!["a", "b", "c", "d", "e", "z"]);

        // Collapsing from a child moves the cursor to the group row.
        view.set_cursor(3);
        assert_eq!(view.cursor_target().unwrap().name, "d");
        view.toggle_cursor_group();
        assert_eq!(view.cursor_target().unwrap().name, "a");
        assert_eq!(names(&view), vec!["a", "z"]);
    }

    #[test]
    fn test_single_target_group_does_not_toggle() {
        let fx = RunFixture::new(THREE_TARGETS);
        let mut view = TreeView::active(fx.run(), None);
        view.set_cursor(2);
        view.toggle_cursor_group();
        assert!(view.is_expanded("2"));
    }

    #[test]
    fn test_cursor_is_clamped() {
        let fx = RunFixture::new(THREE_TARGETS);
        let mut view = TreeView::active(fx.run(), None);
        view.move_cursor(-5);
        assert_eq!(view.cursor(), 0);
        view.move_cursor(10);
        assert_eq!(view.cursor(), 2);
        view.cursor_to_end();
        assert_eq!(view.cursor_target().unwrap().name, "t3");
    }

    #[test]
    fn test_action_targets_fall_back_to_cursor() {
        let fx = RunFixture::new(THREE_TARGETS);
        let mut view = TreeView::active(fx.run(), None);
        view.set_cursor(1);
        assert_eq!(view.action_targets(), vec!["t2"]);

        view.toggle_cursor_selection();
        view.set_cursor(2);
        view.toggle_cursor_selection();
        assert_eq!(view.action_targets(), vec!["t2", "t3"]);

        view.clear_selection();
        assert!(!view.has_selection());
    }

    #[test]
    fn test_level_selection_covers_hidden_children() {
        let fx = RunFixture::new(FIVE_IN_ONE);
        let mut view = TreeView::active(fx.run(), None);
        view.toggle_cursor_level_selection();
        assert_eq!(view.selected_targets(), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_ensure_cursor_visible() {
        let fx = RunFixture::new(FIVE_IN_ONE);
        let mut view = TreeView::active(fx.run(), None);
        view.toggle_cursor_group();
        view.set_cursor(5);
        view.ensure_cursor_visible(2);
        assert_eq!(view.scroll(), 4);
        view.set_cursor(1);
        view.ensure_cursor_visible(2);
        assert_eq!(view.scroll(), 1);
    }

    #[test]
    fn test_rebuild_keeps_state_and_picks_up_membership() {
        let fx = RunFixture::new(THREE_TARGETS);
        let mut view = TreeView::active(fx.run(), None);
        view.set_expanded("1", false);
        view.select_target("t3");

        fx.write_descriptor(
            "set ACTIVE_TARGETS = \"t1 t2 t3 t4\"\nset TARGET_LEVEL_t1 = \"1\"\nset TARGET_LEVEL_t2 = \"1\"\nset TARGET_LEVEL_t3 = \"2\"\nset TARGET_LEVEL_t4 = \"2\"\n",
        );
        fx.mark("t4", "skip");
        view.rebuild();

        assert!(!view.is_expanded("1"));
        assert_eq!(view.selected_targets(), vec!["t3"]);
        assert_eq!(
            view.forest().target("t4").unwrap().status,
            TargetStatus::Skip
        );
    }

    #[test]
    fn test_trace_view_title_and_source() {
        let fx = RunFixture::new(
            "set ACTIVE_TARGETS = \"a b\"\nset DEPENDENCY_OUT_a = \"b\"\n",
        );
        let view = TreeView::trace(fx.run(), "a", TraceDirection::Down).unwrap();
        assert_eq!(view.title(), "↓ a");
        assert_eq!(names(&view), vec!["a", "b"]);
        assert!(TreeView::trace(fx.run(), "b", TraceDirection::Down).is_none());
    }

    #[test]
    fn test_tick_reconciles_bound_run() {
        let fx = RunFixture::new(THREE_TARGETS);
        let mut view = TreeView::active(fx.run(), None);
        fx.mark("t1", "scheduled");
        let updates = view.tick();
        assert_eq!(updates.len(), 1);
        assert!(view.tick().is_empty());
    }
}

//! Per-run view state that survives forest rebuilds.
//!
//! State is keyed by level-key and `(level-key, target)` pairs, never by row
//! index. Entries whose level or target no longer exists after a rebuild are
//! ignored.

use crate::run_dir::RunDirectory;
use crate::tree_view::{RowKey, TreeView};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub expanded: HashMap<String, bool>,
    pub selected: HashSet<RowKey>,
    pub selected_levels: HashSet<String>,
    pub cursor: Option<RowKey>,
    pub scroll: usize,
}

impl ViewState {
    /// Snapshot a view.
    pub fn capture(view: &TreeView) -> Self {
        Self {
            expanded: view.expanded.clone(),
            selected: view.selected.clone(),
            selected_levels: view.selected_levels.clone(),
            cursor: view.cursor_key(),
            scroll: view.scroll(),
        }
    }

    /// Restore onto a (possibly rebuilt) view.
    ///
    /// Expansion goes first, then selection and cursor, and scroll last
    /// since expanding rows changes how far the view can scroll.
    pub fn apply(&self, view: &mut TreeView) {
        for (level, &expanded) in &self.expanded {
            if view.forest().has_level(level) {
                view.expanded.insert(level.clone(), expanded);
            }
        }

        for key in &self.selected {
            let still_there = view
                .forest()
                .target(&key.target)
                .is_some_and(|t| t.level == key.level);
            if still_there {
                view.selected.insert(key.clone());
            }
        }
        for level in &self.selected_levels {
            if view.forest().has_level(level) {
                view.selected_levels.insert(level.clone());
            }
        }

        view.restore_cursor(self.cursor.as_ref());
        view.set_scroll(self.scroll);
    }
}

/// In-memory store of view states, one per run directory.
#[derive(Debug, Default)]
pub struct ViewStateStore {
    states: HashMap<PathBuf, ViewState>,
}

impl ViewStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture `view` under its bound run directory.
    pub fn capture(&mut self, view: &TreeView) {
        self.states
            .insert(view.run().root().to_path_buf(), ViewState::capture(view));
    }

    pub fn get(&self, run: &RunDirectory) -> Option<&ViewState> {
        self.states.get(run.root())
    }

    /// Apply the saved state for the view's run, if any. Returns whether a
    /// state was found.
    pub fn apply(&self, view: &mut TreeView) -> bool {
        match self.states.get(view.run().root()) {
            Some(state) => {
                state.apply(view);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{RunFixture, THREE_TARGETS};
    use crate::tree_view::ForestSource;

    const TWO_LEVELS: &str = r#"set ACTIVE_TARGETS = "w x y z"
set TARGET_LEVEL_w = "L1"
set TARGET_LEVEL_x = "L1"
set TARGET_LEVEL_y = "L2"
set TARGET_LEVEL_z = "L2"
"#;

    #[test]
    fn test_state_survives_identical_rebuild() {
        let fx = RunFixture::new(TWO_LEVELS);
        let mut view = TreeView::active(fx.run(), None);
        view.set_expanded("L1", true);
        view.set_expanded("L2", false);
        view.set_cursor(1);
        view.toggle_cursor_selection();
        assert_eq!(view.selected_targets(), vec!["x"]);

        let state = ViewState::capture(&view);
        let fresh = TreeView::active(fx.run(), Some(&state));

        assert!(fresh.is_expanded("L1"));
        assert!(!fresh.is_expanded("L2"));
        assert_eq!(fresh.selected_targets(), vec!["x"]);
        assert_eq!(fresh.cursor_target().unwrap().name, "x");
    }

    #[test]
    fn test_removed_level_is_ignored() {
        let fx = RunFixture::new(TWO_LEVELS);
        let mut view = TreeView::active(fx.run(), None);
        view.set_expanded("L2", false);
        view.select_target("y");
        view.select_target("x");
        let state = ViewState::capture(&view);

        fx.write_descriptor(
            "set ACTIVE_TARGETS = \"w x\"\nset TARGET_LEVEL_w = \"L1\"\nset TARGET_LEVEL_x = \"L1\"\n",
        );
        let rebuilt = TreeView::active(fx.run(), Some(&state));

        assert!(!rebuilt.forest().has_level("L2"));
        assert!(!rebuilt.expanded.contains_key("L2"));
        assert_eq!(rebuilt.selected_targets(), vec!["x"]);
    }

    #[test]
    fn test_target_moved_to_other_level_is_not_reselected() {
        let fx = RunFixture::new(TWO_LEVELS);
        let mut view = TreeView::active(fx.run(), None);
        view.select_target("w");
        let state = ViewState::capture(&view);

        fx.write_descriptor(
            "set ACTIVE_TARGETS = \"w\"\nset TARGET_LEVEL_w = \"L9\"\n",
        );
        let rebuilt = TreeView::active(fx.run(), Some(&state));
        assert!(rebuilt.selected_targets().is_empty());
    }

    #[test]
    fn test_saved_expansion_beats_default() {
        let fx = RunFixture::new(THREE_TARGETS);
        let mut view = TreeView::active(fx.run(), None);
        assert!(view.is_expanded("1"));
        view.set_expanded("1", false);
        let state = ViewState::capture(&view);

        let again = TreeView::active(fx.run(), Some(&state));
        assert!(!again.is_expanded("1"));
    }

    #[test]
    fn test_scroll_is_restored_after_expansion() {
        let fx = RunFixture::new(TWO_LEVELS);
        let mut view = TreeView::active(fx.run(), None);
        view.set_scroll(3);
        view.set_cursor(3);
        let state = ViewState::capture(&view);
        assert_eq!(state.scroll, 3);

        let restored = TreeView::active(fx.run(), Some(&state));
        assert_eq!(restored.scroll(), 3);
        assert_eq!(restored.cursor_target().unwrap().name, "z");
    }

    #[test]
    fn test_store_is_keyed_by_run() {
        let a = RunFixture::named("a", TWO_LEVELS);
        let b = RunFixture::named("b", TWO_LEVELS);
        let mut store = ViewStateStore::new();

        let mut view_a = TreeView::active(a.run(), None);
        view_a.set_expanded("L1", false);
        store.capture(&view_a);

        let mut view_b = TreeView::active(b.run(), None);
        assert!(!store.apply(&mut view_b));
        assert!(view_b.is_expanded("L1"));

        let mut view_a2 = TreeView::new(
            a.run(),
            ForestSource::Active,
            crate::forest::build(&a.run()),
            None,
        );
        assert!(store.apply(&mut view_a2));
        assert!(!view_a2.is_expanded("L1"));
        assert!(store.get(&a.run()).is_some());
        assert!(store.get(&b.run()).is_none());
    }
}

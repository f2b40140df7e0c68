//! Tabs of the dashboard.
//!
//! The main run tab always comes first and cannot be closed. Trace tabs
//! follow in the order they were opened, then the All Runs tab if open.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    /// Active targets of the selected run directory.
    Main,
    /// Trace tab by position among open traces.
    Trace(usize),
    /// Latest mark of every discovered run.
    AllRuns,
}

impl Tab {
    pub fn is_closable(&self) -> bool {
        !matches!(self, Tab::Main)
    }

    /// All open tabs in header order.
    pub fn all(trace_count: usize, all_runs_open: bool) -> Vec<Tab> {
        let mut tabs = Vec::with_capacity(trace_count + 2);
        tabs.push(Tab::Main);
        tabs.extend((0..trace_count).map(Tab::Trace));
        if all_runs_open {
            tabs.push(Tab::AllRuns);
        }
        tabs
    }

    fn position(&self, tabs: &[Tab]) -> usize {
        tabs.iter().position(|t| t == self).unwrap_or(0)
    }

    pub fn next(&self, trace_count: usize, all_runs_open: bool) -> Tab {
        let tabs = Tab::all(trace_count, all_runs_open);
        tabs[(self.position(&tabs) + 1) % tabs.len()]
    }

    pub fn prev(&self, trace_count: usize, all_runs_open: bool) -> Tab {
        let tabs = Tab::all(trace_count, all_runs_open);
        let idx = self.position(&tabs);
        tabs[(idx + tabs.len() - 1) % tabs.len()]
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tab::Main => write!(f, "Main"),
            Tab::Trace(i) => write!(f, "Trace {}", i + 1),
            Tab::AllRuns => write!(f, "All Runs"),
        }
    }
}

//! Terminal dashboard for XMeta runs.
//!
//! One main tab follows the selected run directory; trace tabs and the All
//! Runs overview can be opened next to it. Every open view is reconciled
//! against its own run directory once per poll interval.
//!
//! Keys:
//! - Tab / Shift+Tab: switch tabs, `w`: close tab, `a`: All Runs
//! - ↑↓ / jk: move, Enter: expand or collapse a level group
//! - Space: select target, `L`: select level, Esc: clear selection
//! - `n` / `p`: next / previous run directory
//! - `r` run, `R` run all, `x` stop, `s` skip, `u` unskip, `i` invalid
//!   (the selection is cleared afterwards)
//! - `e` shell script, `c` command file, `l` log, `T` XMeta terminal
//! - `y`: copy the target name to the clipboard
//! - `U` / `D`: trace up / down
//! - `q`: quit

pub mod app;
pub mod views;

pub use app::{run_monitor, MonitorApp};

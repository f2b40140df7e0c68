pub mod cli;
pub mod commands;
pub mod completion;
pub mod config;
pub mod dependency;
pub mod dispatch;
pub mod error;
pub mod forest;
pub mod launch;
pub mod logging;
pub mod monitor;
pub mod output;
pub mod reconcile;
pub mod run_dir;
pub mod signal;
pub mod status;
pub mod trace;
pub mod tree_view;
pub mod view_state;

#[cfg(test)]
mod test_utils;

pub use dependency::{DependencyFile, ParsedDependencies};
pub use error::{Result, XMetaError};
pub use forest::{Forest, LevelGroup, Target};
pub use run_dir::RunDirectory;
pub use status::TargetStatus;
pub use tree_view::TreeView;
pub use view_state::{ViewState, ViewStateStore};

//! Tracing setup.
//!
//! Everything goes to a daily rolling file under
//! `~/.config/xmeta-console/logs/`. Non-interactive commands also echo to
//! stderr; the TUI never does since stray output corrupts the screen.

use crate::config;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "xmeta-console.log";

pub struct LogOptions<'a> {
    /// Filter used when `RUST_LOG` is unset.
    pub default_level: &'a str,
    /// Force `debug` regardless of the configured level.
    pub verbose: bool,
    pub tui_mode: bool,
}

/// Pick the file filter: `RUST_LOG` wins, then `-v`, then the config level.
fn file_filter(options: &LogOptions<'_>) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = if options.verbose {
        "debug"
    } else {
        options.default_level
    };
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer when dropped, so keep it alive
/// for the whole process.
pub fn init(options: LogOptions<'_>) -> Option<WorkerGuard> {
    let env_filter = file_filter(&options);

    let mut guard = None;
    let file_layer = match config::log_dir().and_then(|dir| {
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }) {
        Ok(log_dir) => {
            let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
            let (file_writer, worker_guard) = tracing_appender::non_blocking(file_appender);
            guard = Some(worker_guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(file_writer)
                    .with_ansi(false)
                    .with_filter(env_filter.clone()),
            )
        }
        Err(err) => {
            if !options.tui_mode {
                eprintln!("Warning: failed to create logs directory: {}", err);
            }
            None
        }
    };

    let console_layer = (!options.tui_mode).then(|| {
        let console_filter = if options.verbose {
            env_filter
        } else {
            EnvFilter::new("warn")
        };
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
    });

    // A subscriber may already be installed in tests.
    let _ = tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init();

    guard
}

//! Ctrl+C handling for the non-interactive `watch` loop.

use crate::error::{Result, XMetaError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Set once SIGINT arrives; the watch loop checks it between ticks.
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    /// Register the process-wide SIGINT handler.
    pub fn install() -> Result<Self> {
        let flag = Arc::new(AtomicBool::new(false));
        let handler_flag = Arc::clone(&flag);
        ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst))
            .map_err(|e| XMetaError::SignalHandler(e.to_string()))?;
        Ok(Self(flag))
    }

    pub fn requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

//! Process-wide interrupt flag fed by SIGINT/SIGTERM.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tracing::debug;

/// Cloneable flag raised when the operator interrupts the run.
///
/// The supervisor and the loop poll it; the signal handler only stores `true`.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the process signal handler and return the flag it raises.
    ///
    /// Can only succeed once per process.
    pub fn install() -> Result<Self> {
        let flag = Self::new();
        let handler_flag = flag.clone();
        ctrlc::set_handler(move || {
            handler_flag.raise();
        })
        .context("install interrupt handler")?;
        debug!("interrupt handler installed");
        Ok(flag)
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

//! Per-run settings threaded through the engine.

use std::path::PathBuf;

use crate::core::budget::IterationBudget;
use crate::core::types::AgentKind;
use crate::io::display::DisplayConfig;
use crate::io::executor::ExecRequest;
use crate::io::init::TaskPaths;

/// Everything an iteration needs that does not change during a run.
///
/// Only the iteration counter moves, and only through [`RunContext::advance_iteration`].
#[derive(Debug, Clone)]
pub struct RunContext {
    pub agent: AgentKind,
    pub model: Option<String>,
    pub safe_mode: bool,
    pub paths: TaskPaths,
    pub budget: IterationBudget,
    pub log_lines: usize,
    pub display: DisplayConfig,
    /// Directory the agent runs in.
    pub workdir: PathBuf,
    /// Where attempt output sinks are created. `None` uses the system temp dir.
    pub scratch_dir: Option<PathBuf>,
    iteration: u32,
}

impl RunContext {
    pub fn new(agent: AgentKind, paths: TaskPaths, workdir: PathBuf) -> Self {
        Self {
            agent,
            model: None,
            safe_mode: false,
            paths,
            budget: IterationBudget::default(),
            log_lines: 50,
            display: DisplayConfig::plain(),
            workdir,
            scratch_dir: None,
            iteration: 0,
        }
    }

    /// Iterations started so far.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// Bump the counter and return the new iteration number (1-based).
    pub fn advance_iteration(&mut self) -> u32 {
        self.iteration = self.iteration.saturating_add(1);
        self.iteration
    }

    pub fn exec_request(&self, prompt: String) -> ExecRequest {
        ExecRequest {
            workdir: self.workdir.clone(),
            prompt,
            model: self.model.clone(),
            safe_mode: self.safe_mode,
        }
    }
}

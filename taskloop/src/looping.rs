//! Iteration engine for `taskloop run`.

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::attempt::{AttemptOutcome, AttemptResult, run_attempt};
use crate::core::types::AttemptProgress;
use crate::io::context::RunContext;
use crate::io::executor::Executor;
use crate::io::interrupt::InterruptFlag;
use crate::io::prompt::PromptBuilder;
use crate::io::task_source::TaskSource;

/// Reason why `run_loop` stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopStop {
    /// No incomplete tasks remain.
    Completed,
    /// The next iteration would exceed the configured budget.
    BudgetExhausted {
        max_iterations: u32,
        remaining: usize,
    },
    /// The operator interrupted the run.
    Interrupted,
}

/// Summary of a loop invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopOutcome {
    /// Attempts launched, including one cut short by an interrupt.
    pub attempts: u32,
    pub stop: LoopStop,
}

/// Run the agent once per iteration until the task list is complete, the
/// budget is spent, or the operator interrupts.
///
/// Failed attempts do not stop the loop. The task list is re-read before
/// every decision; a list that can no longer be read stops the run with an error.
#[instrument(skip_all, fields(task_path = %ctx.paths.task_path.display()))]
pub fn run_loop<E: Executor, F: FnMut(&AttemptOutcome)>(
    ctx: &mut RunContext,
    source: &dyn TaskSource,
    executor: &E,
    prompts: &PromptBuilder,
    interrupt: &InterruptFlag,
    mut on_attempt: F,
) -> Result<LoopOutcome> {
    let mut attempts = 0u32;
    loop {
        if interrupt.is_raised() {
            return Ok(LoopOutcome {
                attempts,
                stop: LoopStop::Interrupted,
            });
        }

        let counts = source.counts().context("re-read task list")?;
        if counts.remaining == 0 {
            info!(attempts, completed = counts.completed, "task list complete");
            return Ok(LoopOutcome {
                attempts,
                stop: LoopStop::Completed,
            });
        }

        let iteration = ctx.advance_iteration();
        if ctx.budget.exceeded_by(iteration) {
            info!(
                attempts,
                max_iterations = ctx.budget.max_iterations(),
                remaining = counts.remaining,
                "iteration budget exhausted"
            );
            return Ok(LoopOutcome {
                attempts,
                stop: LoopStop::BudgetExhausted {
                    max_iterations: ctx.budget.max_iterations(),
                    remaining: counts.remaining,
                },
            });
        }

        let current = counts.completed + 1;
        let label = source
            .next_task_label()
            .context("re-read task list")?
            .unwrap_or_else(|| format!("Task {current}"));
        let progress = AttemptProgress {
            current,
            total: counts.total(),
            label,
        };
        let prompt = prompts.build(source.format(), &ctx.paths)?;
        debug!(iteration, current, total = progress.total, "starting attempt");

        attempts += 1;
        match run_attempt(ctx, executor, interrupt, iteration, progress, prompt)? {
            AttemptResult::Finished(outcome) => on_attempt(&outcome),
            AttemptResult::Interrupted => {
                return Ok(LoopOutcome {
                    attempts,
                    stop: LoopStop::Interrupted,
                });
            }
        }
    }
}

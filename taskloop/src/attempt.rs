//! One supervised agent attempt: sink, renderer, child, terminal status line.

use std::io::{self, Write};
use std::process::ExitStatus;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

use crate::core::frame::attempt_status_line;
use crate::core::types::{AttemptProgress, AttemptStatus};
use crate::io::context::RunContext;
use crate::io::display::{DisplayConfig, erase_lines};
use crate::io::executor::Executor;
use crate::io::interrupt::InterruptFlag;
use crate::io::process::{AgentProcess, WaitOutcome};
use crate::io::renderer::{RenderRequest, Renderer};

/// Record of a finished attempt, handed to the loop's observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptOutcome {
    pub iteration: u32,
    pub progress: AttemptProgress,
    pub status: AttemptStatus,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    Finished(AttemptOutcome),
    /// The operator interrupted; the renderer and child are stopped and the sink removed.
    Interrupted,
}

/// Something an attempt must shut down before its sink goes away.
///
/// Shutting down twice is a no-op.
trait AttemptWorker {
    fn shut_down(&mut self);
}

impl AttemptWorker for Renderer {
    fn shut_down(&mut self) {
        self.stop();
    }
}

impl AttemptWorker for AgentProcess {
    fn shut_down(&mut self) {
        self.terminate();
    }
}

/// Owns the attempt's workers. Dropping it stops the renderer, then the
/// child, then removes the sink, whichever of them were started.
struct AttemptGuard<R: AttemptWorker = Renderer, P: AttemptWorker = AgentProcess> {
    renderer: R,
    process: P,
    // Declared last so it is removed after both workers have stopped.
    sink: NamedTempFile,
}

impl<R: AttemptWorker, P: AttemptWorker> AttemptGuard<R, P> {
    /// Stop the renderer, then the child. The sink stays until the guard drops.
    fn shut_down(&mut self) {
        self.renderer.shut_down();
        self.process.shut_down();
    }
}

impl<R: AttemptWorker, P: AttemptWorker> Drop for AttemptGuard<R, P> {
    fn drop(&mut self) {
        self.shut_down();
        debug!(sink = %self.sink.path().display(), "removing attempt output");
    }
}

/// Launch the agent once for `progress` and wait for it.
///
/// A failure to spawn the agent is a failed attempt, not an error. Errors are
/// reserved for the orchestrator's own I/O.
#[instrument(skip_all, fields(iteration = iteration))]
pub fn run_attempt<E: Executor>(
    ctx: &RunContext,
    executor: &E,
    interrupt: &InterruptFlag,
    iteration: u32,
    progress: AttemptProgress,
    prompt: String,
) -> Result<AttemptResult> {
    let cmd = executor.command(&ctx.exec_request(prompt))?;
    let sink = create_sink(ctx)?;
    let mut guard: AttemptGuard = AttemptGuard {
        renderer: Renderer::idle(),
        process: AgentProcess::idle(),
        sink,
    };

    let started = Instant::now();
    guard.renderer = Renderer::start(
        RenderRequest {
            sink_path: guard.sink.path().to_path_buf(),
            progress: progress.clone(),
            started,
            log_lines: ctx.log_lines,
            display: ctx.display,
        },
        io::stdout(),
    )?;

    let status = match AgentProcess::launch(cmd, guard.sink.as_file()) {
        Ok(process) => {
            guard.process = process;
            match guard.process.wait(interrupt)? {
                WaitOutcome::Exited(status) => classify(status),
                WaitOutcome::Interrupted => {
                    guard.shut_down();
                    let drawn = guard.renderer.stop();
                    erase_lines(&mut io::stdout(), drawn).context("erase progress block")?;
                    info!(iteration, "attempt interrupted");
                    return Ok(AttemptResult::Interrupted);
                }
            }
        }
        Err(err) => {
            warn!(err = %format!("{err:#}"), "agent could not be started");
            AttemptStatus::LaunchFailed
        }
    };

    let drawn = guard.renderer.stop();
    let elapsed = started.elapsed();
    let mut stdout = io::stdout();
    erase_lines(&mut stdout, drawn).context("erase progress block")?;
    print_status_line(&mut stdout, ctx.display, &progress, status, elapsed)?;
    drop(guard);

    info!(iteration, status = ?status, elapsed_ms = elapsed_millis(elapsed), "attempt finished");
    Ok(AttemptResult::Finished(AttemptOutcome {
        iteration,
        progress,
        status,
        elapsed,
    }))
}

fn create_sink(ctx: &RunContext) -> Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("taskloop-").suffix(".log");
    let sink = match &ctx.scratch_dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    };
    sink.context("create attempt output file")
}

/// Whole milliseconds in `elapsed`, saturating at `u64::MAX`.
fn elapsed_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

fn classify(status: ExitStatus) -> AttemptStatus {
    if status.success() {
        AttemptStatus::Succeeded
    } else {
        AttemptStatus::Failed {
            code: status.code(),
        }
    }
}

fn print_status_line<W: Write>(
    out: &mut W,
    display: DisplayConfig,
    progress: &AttemptProgress,
    status: AttemptStatus,
    elapsed: Duration,
) -> Result<()> {
    let line = attempt_status_line(progress, status, elapsed);
    let painted = if status.is_success() {
        display.success(&line)
    } else {
        display.failure(&line)
    };
    writeln!(out, "{painted}").context("write attempt status")?;
    out.flush().context("flush stdout")
}

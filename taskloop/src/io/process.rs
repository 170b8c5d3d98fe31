//! Supervision of the agent child process.
//!
//! One [`AgentProcess`] wraps at most one child. Its stdout and stderr both
//! point at the attempt's output sink, which the renderer reads concurrently.
//! Waiting happens in short slices so an interrupt is noticed promptly.

use std::fs::File;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

use crate::io::interrupt::InterruptFlag;

/// How long one wait slice blocks before the interrupt flag is checked again.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How a supervised wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Exited(ExitStatus),
    /// The interrupt flag was raised; the child may still be running.
    Interrupted,
}

/// Handle to a (possibly never started) agent child process.
#[derive(Debug, Default)]
pub struct AgentProcess {
    child: Option<Child>,
    status: Option<ExitStatus>,
}

impl AgentProcess {
    /// Handle with no child. `wait` fails, `terminate` is a no-op.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Spawn `cmd` with stdin closed and stdout/stderr appended to `sink`.
    #[instrument(skip_all)]
    pub fn launch(mut cmd: Command, sink: &File) -> Result<Self> {
        let stdout = sink.try_clone().context("clone output sink for stdout")?;
        let stderr = sink.try_clone().context("clone output sink for stderr")?;
        cmd.stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));

        debug!(program = ?cmd.get_program(), "spawning agent process");
        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                error!(err = %err, program = ?cmd.get_program(), "failed to spawn agent");
                return Err(err).with_context(|| format!("spawn {:?}", cmd.get_program()));
            }
        };
        debug!(pid = child.id(), "agent process started");
        Ok(Self {
            child: Some(child),
            status: None,
        })
    }

    /// Exit status once the child has been reaped.
    pub fn status(&self) -> Option<ExitStatus> {
        self.status
    }

    /// Block until the child exits or `interrupt` is raised.
    ///
    /// An interrupt leaves the child running; the caller decides when to
    /// [`terminate`](Self::terminate) it.
    pub fn wait(&mut self, interrupt: &InterruptFlag) -> Result<WaitOutcome> {
        if let Some(status) = self.status {
            return Ok(WaitOutcome::Exited(status));
        }
        loop {
            if interrupt.is_raised() {
                warn!("interrupt received while waiting for agent");
                return Ok(WaitOutcome::Interrupted);
            }
            let child = self
                .child
                .as_mut()
                .ok_or_else(|| anyhow!("agent process was never launched"))?;
            if let Some(status) = child
                .wait_timeout(POLL_INTERVAL)
                .context("wait for agent process")?
            {
                debug!(exit_code = ?status.code(), "agent process exited");
                self.status = Some(status);
                self.child = None;
                return Ok(WaitOutcome::Exited(status));
            }
        }
    }

    /// Kill and reap the child if it is still running.
    ///
    /// Safe to call repeatedly, after exit, or on an idle handle.
    pub fn terminate(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Ok(Some(status)) = child.try_wait() {
            self.status = Some(status);
            return;
        }
        if let Err(err) = child.kill() {
            warn!(err = %err, pid = child.id(), "failed to kill agent process");
        }
        match child.wait() {
            Ok(status) => {
                debug!(exit_code = ?status.code(), "agent process reaped after kill");
                self.status = Some(status);
            }
            Err(err) => warn!(err = %err, "failed to reap agent process"),
        }
    }
}

impl Drop for AgentProcess {
    fn drop(&mut self) {
        self.terminate();
    }
}

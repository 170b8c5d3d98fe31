//! Live progress block repainted while an agent attempt runs.
//!
//! The renderer runs on its own thread and redraws every [`TICK`]: it erases
//! exactly the lines it drew last time, then draws a status line followed by
//! the tail of the attempt's output sink. It stops only when asked, and
//! [`Renderer::stop`] joins the thread and returns the line count of the final
//! frame so the caller can erase it before printing the attempt's result.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::core::frame::compose_frame;
use crate::core::types::AttemptProgress;
use crate::io::display::{DisplayConfig, erase_lines, terminal_viewport};

/// Repaint interval.
pub const TICK: Duration = Duration::from_millis(100);

/// Only the last this-many bytes of the sink are read per frame.
const TAIL_BYTES: u64 = 64 * 1024;

/// Everything the render thread needs for one attempt.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub sink_path: PathBuf,
    pub progress: AttemptProgress,
    pub started: Instant,
    /// Number of output lines shown under the status line.
    pub log_lines: usize,
    pub display: DisplayConfig,
}

/// Stop handle for a running (or never started) render thread.
#[derive(Debug, Default)]
pub struct Renderer {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<usize>>,
    last_drawn: usize,
}

impl Renderer {
    /// Renderer that never draws. `stop` returns 0.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Start repainting to `out`. Returns an idle renderer when live display is off.
    pub fn start<W: Write + Send + 'static>(request: RenderRequest, out: W) -> Result<Self> {
        if !request.display.live {
            debug!("live display disabled, renderer idle");
            return Ok(Self::idle());
        }
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("taskloop-render".to_string())
            .spawn(move || {
                let mut out = out;
                let mut drawn = 0usize;
                let mut tick = 0usize;
                loop {
                    match paint(&request, &mut out, tick, drawn) {
                        Ok(lines) => drawn = lines,
                        Err(err) => debug!(err = %err, "render tick failed"),
                    }
                    tick = tick.wrapping_add(1);
                    match stop_rx.recv_timeout(TICK) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => return drawn,
                    }
                }
            })
            .context("spawn render thread")?;
        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
            last_drawn: 0,
        })
    }

    /// Signal the thread, wait for it to finish, and return the number of
    /// lines in the last frame it drew.
    ///
    /// Idempotent: later calls return the same count without blocking.
    pub fn stop(&mut self) -> usize {
        if let Some(stop_tx) = self.stop_tx.take() {
            // The thread may already be gone; a closed channel stops it too.
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(drawn) => self.last_drawn = drawn,
                Err(_) => warn!("render thread panicked"),
            }
        }
        self.last_drawn
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Draw one frame, replacing the previous `previous` lines. Returns lines drawn.
///
/// The whole frame is assembled first and written in one call to keep the
/// repaint flicker-free.
fn paint<W: Write>(
    request: &RenderRequest,
    out: &mut W,
    tick: usize,
    previous: usize,
) -> io::Result<usize> {
    let output = read_tail(&request.sink_path, TAIL_BYTES).unwrap_or_default();
    let lines = compose_frame(
        tick,
        &request.progress,
        request.started.elapsed(),
        &output,
        request.log_lines,
        terminal_viewport(),
    );

    let display = request.display;
    let mut frame = Vec::new();
    erase_lines(&mut frame, previous)?;
    for (index, line) in lines.iter().enumerate() {
        let painted = if index == 0 {
            display.accent(line)
        } else {
            display.muted(line)
        };
        writeln!(frame, "{painted}")?;
    }
    out.write_all(&frame)?;
    out.flush()?;
    Ok(lines.len())
}

fn read_tail(path: &Path, max_bytes: u64) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    if len > max_bytes {
        file.seek(SeekFrom::Start(len - max_bytes))?;
    }
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    Ok(buf)
}

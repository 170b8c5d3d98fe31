//! Pure text composition for the progress display.
//!
//! Nothing here touches the terminal; the renderer and status printers add
//! color and cursor control on top of these plain lines.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use unicode_width::UnicodeWidthChar;

use crate::core::selector::truncate_chars;
use crate::core::types::{AttemptProgress, AttemptStatus};

pub const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Prefix drawn before every line of agent output.
pub const GUTTER: &str = "│ ";

/// Task labels on status lines are clipped to this many characters.
pub const STATUS_LABEL_CHARS: usize = 50;

/// Columns a tab expands to in the output tail.
const TAB_WIDTH: usize = 4;

/// Rows kept free below the frame so the cursor line never scrolls it.
const RESERVED_ROWS: usize = 1;

/// Visible terminal area the frame must fit in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: usize,
    pub height: usize,
}

impl Viewport {
    /// Output lines that fit under the status line, capped at `max_lines`.
    fn tail_rows(&self, max_lines: usize) -> usize {
        max_lines.min(self.height.saturating_sub(1 + RESERVED_ROWS))
    }
}

static ANSI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07]*\x07").expect("ansi pattern is valid")
});

pub fn spinner_glyph(tick: usize) -> &'static str {
    SPINNER_FRAMES[tick % SPINNER_FRAMES.len()]
}

/// Format elapsed time as `mm:ss`. Minutes keep counting past 59.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// `⠋ [2/5] Add login page [01:23]`
pub fn status_line(glyph: &str, progress: &AttemptProgress, elapsed: Duration) -> String {
    format!(
        "{glyph} [{}/{}] {} [{}]",
        progress.current,
        progress.total,
        truncate_chars(&progress.label, STATUS_LABEL_CHARS),
        format_elapsed(elapsed)
    )
}

/// Terminal line printed once an attempt ends.
pub fn attempt_status_line(
    progress: &AttemptProgress,
    status: AttemptStatus,
    elapsed: Duration,
) -> String {
    let label = truncate_chars(&progress.label, STATUS_LABEL_CHARS);
    let counter = format!("[{}/{}]", progress.current, progress.total);
    let elapsed = format_elapsed(elapsed);
    match status {
        AttemptStatus::Succeeded => format!("✓ {counter} {label} ({elapsed})"),
        AttemptStatus::Failed { code: Some(code) } => {
            format!("✗ {counter} {label} failed with exit code {code} ({elapsed})")
        }
        AttemptStatus::Failed { code: None } => {
            format!("✗ {counter} {label} killed by signal ({elapsed})")
        }
        AttemptStatus::LaunchFailed => {
            format!("✗ {counter} {label} could not start agent ({elapsed})")
        }
    }
}

/// Last `max_lines` lines of raw agent output, cleaned for redraw.
///
/// NUL bytes and escape sequences are stripped, carriage-return overwrites
/// keep only their final segment, and each line is clipped so that it fits
/// in `width` columns together with the gutter.
pub fn tail_lines(raw: &[u8], max_lines: usize, width: usize) -> Vec<String> {
    if max_lines == 0 {
        return Vec::new();
    }
    let cleaned: Vec<u8> = raw.iter().copied().filter(|byte| *byte != 0).collect();
    let text = String::from_utf8_lossy(&cleaned);
    let text = ANSI_RE.replace_all(&text, "");
    let room = width.saturating_sub(GUTTER.chars().count()).max(1);

    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..]
        .iter()
        .map(|line| {
            let visible = line.rsplit('\r').next().unwrap_or_default();
            format!("{GUTTER}{}", clip_columns(visible, room))
        })
        .collect()
}

/// Clip `text` to at most `columns` terminal columns.
///
/// Tabs expand to [`TAB_WIDTH`] spaces and other control characters are
/// dropped, so the result occupies exactly one terminal row. A wide character
/// that would straddle the limit is left out.
fn clip_columns(text: &str, columns: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let (piece, cols) = match ch {
            '\t' => (" ".repeat(TAB_WIDTH), TAB_WIDTH),
            ch if ch.is_control() => continue,
            ch => (ch.to_string(), UnicodeWidthChar::width(ch).unwrap_or(0)),
        };
        if used + cols > columns {
            break;
        }
        used += cols;
        out.push_str(&piece);
    }
    out
}

/// Full frame: one status line followed by the output tail.
///
/// Every line fits in one row of `viewport` and the frame never exceeds its
/// height, so the next repaint can erase exactly what was drawn.
pub fn compose_frame(
    tick: usize,
    progress: &AttemptProgress,
    elapsed: Duration,
    output: &[u8],
    max_lines: usize,
    viewport: Viewport,
) -> Vec<String> {
    let width = viewport.width.max(1);
    let status = status_line(spinner_glyph(tick), progress, elapsed);
    let mut lines = vec![clip_columns(&status, width)];
    lines.extend(tail_lines(output, viewport.tail_rows(max_lines), width));
    lines
}

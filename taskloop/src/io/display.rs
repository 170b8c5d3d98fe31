//! Terminal display configuration and cursor helpers.
//!
//! Color and live-redraw decisions are made once at startup and carried in a
//! [`DisplayConfig`] value; nothing here keeps global terminal state.

use std::io::{self, IsTerminal, Write};

use clap::ValueEnum;
use crossterm::cursor::MoveToPreviousLine;
use crossterm::queue;
use crossterm::style::{Color, Stylize};
use crossterm::terminal::{self, Clear, ClearType};
use serde::{Deserialize, Serialize};

use crate::core::frame::Viewport;

/// Width assumed when the terminal size cannot be queried.
pub const FALLBACK_WIDTH: usize = 80;

/// Rows assumed when the terminal size cannot be queried.
pub const FALLBACK_HEIGHT: usize = 24;

/// Color output mode for terminal display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Color when stdout is a terminal and `NO_COLOR` is unset.
    #[default]
    Auto,
    Always,
    Never,
}

/// Resolved display capabilities for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayConfig {
    /// Wrap status text in ANSI colors.
    pub color: bool,
    /// Repaint the progress block in place. Off when stdout is not a terminal.
    pub live: bool,
}

impl DisplayConfig {
    pub fn detect(mode: ColorMode) -> Self {
        let tty = io::stdout().is_terminal();
        let no_color = std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty());
        Self::resolve(mode, tty, no_color)
    }

    fn resolve(mode: ColorMode, tty: bool, no_color: bool) -> Self {
        let color = match mode {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => tty && !no_color,
        };
        Self { color, live: tty }
    }

    /// No color, no live redraw. Used for tests and piped output.
    pub fn plain() -> Self {
        Self {
            color: false,
            live: false,
        }
    }

    pub fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.with(color).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn success(&self, text: &str) -> String {
        self.paint(text, Color::Green)
    }

    pub fn failure(&self, text: &str) -> String {
        self.paint(text, Color::Red)
    }

    pub fn notice(&self, text: &str) -> String {
        self.paint(text, Color::Yellow)
    }

    pub fn muted(&self, text: &str) -> String {
        self.paint(text, Color::DarkGrey)
    }

    pub fn accent(&self, text: &str) -> String {
        self.paint(text, Color::Cyan)
    }
}

/// Erase the `count` lines directly above the cursor and leave the cursor at
/// the start of the topmost erased line.
///
/// `count == 0` is a no-op: some terminals treat a zero-line move as one.
pub fn erase_lines<W: Write>(out: &mut W, count: usize) -> io::Result<()> {
    if count == 0 {
        return Ok(());
    }
    let rows = u16::try_from(count).unwrap_or(u16::MAX);
    queue!(out, MoveToPreviousLine(rows), Clear(ClearType::FromCursorDown))?;
    out.flush()
}

/// Current terminal size, falling back per dimension when it is unknown or zero.
pub fn terminal_viewport() -> Viewport {
    let (cols, rows) = terminal::size().unwrap_or((0, 0));
    viewport_from(cols, rows)
}

fn viewport_from(cols: u16, rows: u16) -> Viewport {
    let or_fallback = |value: u16, fallback: usize| match value {
        0 => fallback,
        value => usize::from(value),
    };
    Viewport {
        width: or_fallback(cols, FALLBACK_WIDTH),
        height: or_fallback(rows, FALLBACK_HEIGHT),
    }
}

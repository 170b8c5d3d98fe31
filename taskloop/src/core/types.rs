//! Shared deterministic types for the loop core.
//!
//! These types define stable contracts between components. They must not
//! depend on external state or I/O.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// External coding agent driven by the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// Claude Code (`claude`).
    #[default]
    Claude,
    /// OpenAI Codex CLI (`codex exec`).
    Codex,
    /// Cursor CLI (`cursor-agent`).
    Cursor,
}

impl AgentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentKind::Claude => "claude",
            AgentKind::Codex => "codex",
            AgentKind::Cursor => "cursor",
        }
    }

    /// Executable looked up on `PATH`.
    pub fn program(self) -> &'static str {
        match self {
            AgentKind::Claude => "claude",
            AgentKind::Codex => "codex",
            AgentKind::Cursor => "cursor-agent",
        }
    }
}

/// Completed/remaining split of a task list at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskCounts {
    pub completed: usize,
    pub remaining: usize,
}

impl TaskCounts {
    pub fn total(&self) -> usize {
        self.completed + self.remaining
    }
}

/// What the status line shows for the attempt in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptProgress {
    /// 1-indexed number of the task being worked on (`completed + 1`).
    pub current: usize,
    pub total: usize,
    pub label: String,
}

/// Terminal classification of one agent attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    /// Agent exited with status zero.
    Succeeded,
    /// Agent exited non-zero; `code` is `None` when killed by a signal.
    Failed { code: Option<i32> },
    /// The agent process could not be spawned.
    LaunchFailed,
}

impl AttemptStatus {
    pub fn is_success(self) -> bool {
        matches!(self, AttemptStatus::Succeeded)
    }
}

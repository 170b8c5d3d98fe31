//! Read-only report for `taskloop status`.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::types::TaskCounts;
use crate::io::init::TaskPaths;
use crate::io::task_source::open_task_source;
use crate::task::TaskFormat;

/// Snapshot of a task list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub task_path: PathBuf,
    pub format: TaskFormat,
    pub counts: TaskCounts,
    pub next: Option<String>,
}

impl StatusReport {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Task list: {} ({})",
            self.task_path.display(),
            self.format.as_str()
        );
        let _ = writeln!(
            out,
            "Completed: {}/{}",
            self.counts.completed,
            self.counts.total()
        );
        let _ = writeln!(out, "Remaining: {}", self.counts.remaining);
        match &self.next {
            Some(label) => {
                let _ = writeln!(out, "Next: {label}");
            }
            None => {
                let _ = writeln!(out, "Next: none (all tasks complete)");
            }
        }
        out
    }
}

/// Resolve `input` and summarize the task list without launching anything.
pub fn status_from_input(input: &Path) -> Result<StatusReport> {
    let paths = TaskPaths::resolve(input)?;
    let source = open_task_source(&paths.task_path)?;
    Ok(StatusReport {
        format: source.format(),
        counts: source.counts()?,
        next: source.next_task_label()?,
        task_path: paths.task_path,
    })
}

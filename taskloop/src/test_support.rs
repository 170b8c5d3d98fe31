//! Test-only helpers: task list fixtures, a scripted executor, and a
//! thread-safe output buffer.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use serde_json::json;

use crate::core::types::AgentKind;
use crate::io::context::RunContext;
use crate::io::executor::{ExecRequest, Executor};
use crate::io::init::TaskPaths;

/// Write `contents` to `dir/name` and return the path.
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

/// Flat JSON list of `(name, passes)` pairs.
pub fn flat_json(tasks: &[(&str, bool)]) -> String {
    let entries: Vec<_> = tasks
        .iter()
        .map(|(name, passes)| json!({ "name": name, "passes": passes }))
        .collect();
    serde_json::to_string_pretty(&entries).expect("serialize flat list")
}

/// Nested JSON list with ids `T-1`, `T-2`, ... and an agent-only context block.
pub fn nested_json(tasks: &[(&str, bool)]) -> String {
    let stories: Vec<_> = tasks
        .iter()
        .enumerate()
        .map(|(index, (title, passes))| {
            json!({ "id": format!("T-{}", index + 1), "title": title, "passes": passes })
        })
        .collect();
    let doc = json!({
        "project": "fixture",
        "context": { "patterns": [], "keyFiles": [], "nonGoals": [] },
        "userStories": stories,
    });
    serde_json::to_string_pretty(&doc).expect("serialize nested list")
}

/// Markdown checkbox list with a heading and some prose.
pub fn markdown_list(tasks: &[(&str, bool)]) -> String {
    let mut out = String::from("# Tasks\n\nSome notes for the agent.\n\n");
    for (description, passes) in tasks {
        let mark = if *passes { 'x' } else { ' ' };
        out.push_str(&format!("- [{mark}] {description}\n"));
    }
    out
}

/// Run context rooted at `dir` with sinks created in `scratch_dir`.
pub fn test_context(task_path: &Path, scratch_dir: &Path) -> RunContext {
    let dir = task_path.parent().unwrap_or(Path::new(".")).to_path_buf();
    let paths = TaskPaths {
        task_path: task_path.to_path_buf(),
        progress_path: dir.join("progress.txt"),
    };
    let mut ctx = RunContext::new(AgentKind::Claude, paths, dir);
    ctx.scratch_dir = Some(scratch_dir.to_path_buf());
    ctx
}

/// Cloneable in-memory writer usable from another thread.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().expect("buffer lock").clone();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("buffer lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// One scripted agent attempt.
#[derive(Debug, Clone)]
pub struct ScriptedAttempt {
    pub exit_code: i32,
    pub output: String,
    /// Task list contents the "agent" leaves behind. `None` leaves it as is.
    pub task_list_after: Option<String>,
    /// Block until killed instead of exiting.
    pub hang: bool,
    /// Point at a program that does not exist.
    pub unlaunchable: bool,
}

impl ScriptedAttempt {
    pub fn exit(exit_code: i32) -> Self {
        Self {
            exit_code,
            output: format!("agent exiting with {exit_code}\n"),
            task_list_after: None,
            hang: false,
            unlaunchable: false,
        }
    }

    /// Succeed and rewrite the task list.
    pub fn complete(task_list_after: String) -> Self {
        Self {
            task_list_after: Some(task_list_after),
            ..Self::exit(0)
        }
    }

    pub fn hang() -> Self {
        Self {
            hang: true,
            ..Self::exit(0)
        }
    }

    pub fn unlaunchable() -> Self {
        Self {
            unlaunchable: true,
            ..Self::exit(0)
        }
    }
}

/// Executor that replays [`ScriptedAttempt`]s through `sh`.
///
/// Task list edits are applied when the command is built, before the child
/// starts, which matches what the loop observes after the attempt.
#[derive(Debug)]
pub struct ScriptedExecutor {
    task_path: PathBuf,
    attempts: RefCell<VecDeque<ScriptedAttempt>>,
    requests: RefCell<Vec<ExecRequest>>,
}

impl ScriptedExecutor {
    pub fn new(task_path: &Path, attempts: Vec<ScriptedAttempt>) -> Self {
        Self {
            task_path: task_path.to_path_buf(),
            attempts: RefCell::new(attempts.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Requests seen so far, in order.
    pub fn requests(&self) -> Vec<ExecRequest> {
        self.requests.borrow().clone()
    }

    pub fn remaining(&self) -> usize {
        self.attempts.borrow().len()
    }
}

impl Executor for ScriptedExecutor {
    fn command(&self, request: &ExecRequest) -> Result<Command> {
        self.requests.borrow_mut().push(request.clone());
        let attempt = self
            .attempts
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted executor ran out of attempts"))?;

        if let Some(contents) = &attempt.task_list_after {
            fs::write(&self.task_path, contents)?;
        }
        if attempt.unlaunchable {
            return Ok(Command::new("taskloop-missing-agent-binary"));
        }

        let mut cmd = Command::new("sh");
        if attempt.hang {
            cmd.arg("-c").arg("exec sleep 30");
        } else {
            cmd.arg("-c")
                .arg(r#"printf '%s' "$1"; exit "$2""#)
                .arg("sh")
                .arg(&attempt.output)
                .arg(attempt.exit_code.to_string());
        }
        cmd.current_dir(&request.workdir);
        Ok(cmd)
    }
}

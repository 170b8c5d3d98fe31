//! Resolution of the task list and progress file locations.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info};

/// File names tried, in order, when the task list argument is a directory.
pub const TASK_FILE_CANDIDATES: [&str; 5] = ["prd.json", "PRD.json", "PRD.md", "prd.md", "tasks.md"];

/// Progress log shared with the agent, next to the task list.
pub const PROGRESS_FILE_NAME: &str = "progress.txt";

/// Resolved locations for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPaths {
    pub task_path: PathBuf,
    pub progress_path: PathBuf,
}

impl TaskPaths {
    /// Resolve a file or directory argument to concrete paths.
    pub fn resolve(input: &Path) -> Result<Self> {
        let task_path = if input.is_dir() {
            TASK_FILE_CANDIDATES
                .iter()
                .map(|name| input.join(name))
                .find(|candidate| candidate.is_file())
                .ok_or_else(|| {
                    anyhow!(
                        "no task list in {} (looked for {})",
                        input.display(),
                        TASK_FILE_CANDIDATES.join(", ")
                    )
                })?
        } else if input.is_file() {
            input.to_path_buf()
        } else {
            return Err(anyhow!("task list {} does not exist", input.display()));
        };
        let dir = task_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        debug!(task_path = %task_path.display(), "resolved task list");
        Ok(Self {
            progress_path: dir.join(PROGRESS_FILE_NAME),
            task_path,
        })
    }
}

/// Create an empty progress file unless one exists. Returns true if created.
///
/// Existing contents are never touched.
pub fn ensure_progress_file(path: &Path) -> Result<bool> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(_) => {
            info!(path = %path.display(), "created progress file");
            Ok(true)
        }
        Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(err) => {
            Err(err).with_context(|| format!("create progress file {}", path.display()))
        }
    }
}

//! Executor abstraction for agent invocation.
//!
//! The [`Executor`] trait turns one attempt's request into the command line to
//! spawn. [`AgentExecutor`] knows the real agent CLIs; tests substitute
//! scripted executors that run a shell snippet instead.

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Result, anyhow};
use tracing::{debug, instrument};

use crate::core::types::AgentKind;

/// Parameters for one agent invocation.
#[derive(Debug, Clone)]
pub struct ExecRequest {
    /// Working directory for the agent process.
    pub workdir: PathBuf,
    /// Prompt text passed as a command-line argument.
    pub prompt: String,
    pub model: Option<String>,
    /// Ask before acting instead of auto-approving.
    pub safe_mode: bool,
}

/// Abstraction over agent backends.
pub trait Executor {
    /// Build the command for one attempt. The caller owns spawning and I/O wiring.
    fn command(&self, request: &ExecRequest) -> Result<Command>;
}

/// Executor for the supported agent CLIs.
#[derive(Debug, Clone, Copy)]
pub struct AgentExecutor {
    agent: AgentKind,
}

impl AgentExecutor {
    pub fn new(agent: AgentKind) -> Self {
        Self { agent }
    }

    /// Fail unless the agent's executable is on `PATH`.
    pub fn ensure_available(&self) -> Result<PathBuf> {
        let program = self.agent.program();
        let found = env::var_os("PATH")
            .as_deref()
            .and_then(|path| find_on_path(program, path));
        match found {
            Some(path) => {
                debug!(program, path = %path.display(), "agent executable found");
                Ok(path)
            }
            None => Err(anyhow!(
                "agent `{program}` not found on PATH (install it or pick another with --agent)"
            )),
        }
    }
}

impl Executor for AgentExecutor {
    #[instrument(skip_all, fields(agent = self.agent.as_str(), safe = request.safe_mode))]
    fn command(&self, request: &ExecRequest) -> Result<Command> {
        let mut cmd = Command::new(self.agent.program());
        cmd.args(agent_args(self.agent, request))
            .current_dir(&request.workdir);
        Ok(cmd)
    }
}

/// Argument vector after the program name.
pub fn agent_args(agent: AgentKind, request: &ExecRequest) -> Vec<String> {
    let mut args = Vec::new();
    match agent {
        AgentKind::Claude => {
            args.push("-p".to_string());
            args.push(request.prompt.clone());
            push_model(&mut args, request);
            if !request.safe_mode {
                args.push("--dangerously-skip-permissions".to_string());
            }
        }
        AgentKind::Codex => {
            args.push("exec".to_string());
            push_model(&mut args, request);
            args.push(if request.safe_mode {
                "--full-auto".to_string()
            } else {
                "--dangerously-bypass-approvals-and-sandbox".to_string()
            });
            args.push(request.prompt.clone());
        }
        AgentKind::Cursor => {
            args.push("-p".to_string());
            push_model(&mut args, request);
            if !request.safe_mode {
                args.push("--force".to_string());
            }
            args.push(request.prompt.clone());
        }
    }
    args
}

fn push_model(args: &mut Vec<String>, request: &ExecRequest) {
    if let Some(model) = &request.model {
        args.push("--model".to_string());
        args.push(model.clone());
    }
}

/// First executable named `program` in a `PATH`-style list.
pub fn find_on_path(program: &str, path: &OsStr) -> Option<PathBuf> {
    env::split_paths(path)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

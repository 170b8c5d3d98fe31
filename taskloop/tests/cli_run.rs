//! CLI tests for `taskloop run` and `taskloop status`.
//!
//! Spawns the taskloop binary against fixture task lists with a fake agent on
//! `PATH` and checks exit codes, files left behind, and printed output.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use taskloop::exit_codes;
use taskloop::test_support::{flat_json, markdown_list, write_file};
use wait_timeout::ChildExt;

struct Workspace {
    root: tempfile::TempDir,
    bin: tempfile::TempDir,
    scratch: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            root: tempfile::tempdir().expect("root"),
            bin: tempfile::tempdir().expect("bin"),
            scratch: tempfile::tempdir().expect("scratch"),
        }
    }

    fn root(&self) -> &Path {
        self.root.path()
    }

    /// Install an executable `claude` script running `body`.
    fn fake_agent(&self, body: &str) -> PathBuf {
        let path = self.bin.path().join("claude");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write agent");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod agent");
        path
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_taskloop"));
        cmd.current_dir(self.root())
            .env("PATH", format!("{}:/usr/bin:/bin", self.bin.path().display()))
            .env("TMPDIR", self.scratch.path())
            .env_remove("RUST_LOG")
            .stdin(Stdio::null());
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.command()
            .args(args)
            .output()
            .expect("spawn taskloop")
    }

    fn scratch_entries(&self) -> usize {
        fs::read_dir(self.scratch.path())
            .expect("read scratch")
            .count()
    }

    fn progress_path(&self) -> PathBuf {
        self.root().join("progress.txt")
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn malformed_task_list_exits_invalid_without_side_effects() {
    let ws = Workspace::new();
    ws.fake_agent("exit 0");
    write_file(ws.root(), "prd.json", r#"[{"name": "A", "passes": false"#);

    let output = ws.run(&["run"]);

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(stderr(&output).contains("malformed"));
    assert_eq!(ws.scratch_entries(), 0);
    assert!(!ws.progress_path().exists());
}

#[test]
fn missing_marker_is_reported_with_index() {
    let ws = Workspace::new();
    ws.fake_agent("exit 0");
    write_file(
        ws.root(),
        "prd.json",
        r#"{"userStories": [{"id": "US-1", "title": "ok", "passes": true}, {"id": "US-2", "title": "broken"}]}"#,
    );

    let output = ws.run(&["run"]);

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let err = stderr(&output);
    assert!(err.contains("index 1"), "{err}");
    assert!(err.contains("US-2"), "{err}");
}

#[test]
fn agent_completes_the_list() {
    let ws = Workspace::new();
    ws.fake_agent(&format!(
        "echo working on it\nprintf '%s' '{}' > prd.json",
        flat_json(&[("A", true), ("B", true)]).replace('\n', "")
    ));
    write_file(ws.root(), "prd.json", &flat_json(&[("A", false), ("B", true)]));

    let output = ws.run(&["run", "--color", "never"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK), "{}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("✓ [2/2] A"), "{out}");
    assert!(out.contains("All tasks complete after 1 iteration"), "{out}");
    assert!(ws.progress_path().is_file());
    assert_eq!(ws.scratch_entries(), 0);
}

#[test]
fn already_complete_list_runs_nothing() {
    let ws = Workspace::new();
    let marker = ws.root().join("agent-ran");
    ws.fake_agent(&format!("touch '{}'", marker.display()));
    write_file(ws.root(), "PRD.md", &markdown_list(&[("X", true)]));

    let output = ws.run(&["run"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(stdout(&output).contains("after 0 iterations"));
    assert!(!marker.exists());
}

#[test]
fn budget_stops_with_success() {
    let ws = Workspace::new();
    ws.fake_agent("echo no progress; exit 2");
    write_file(ws.root(), "tasks.md", &markdown_list(&[("X", false), ("Y", true)]));

    let output = ws.run(&["run", "--max-iterations", "2", "--color", "never"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let out = stdout(&output);
    assert_eq!(out.matches("failed with exit code 2").count(), 2, "{out}");
    assert!(out.contains("iteration budget (2)"), "{out}");
    assert!(out.contains("1 task(s) remaining"), "{out}");
    assert_eq!(ws.scratch_entries(), 0);
}

#[test]
fn missing_agent_binary_is_a_setup_error() {
    let ws = Workspace::new();
    write_file(ws.root(), "prd.json", &flat_json(&[("A", false)]));

    let output = ws.command().args(["run", "--agent", "cursor"]).output().expect("spawn");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(stderr(&output).contains("cursor-agent"));
    assert!(!ws.progress_path().exists());
}

#[test]
fn bad_flag_value_exits_invalid() {
    let ws = Workspace::new();
    let output = ws.run(&["run", "--agent", "copilot"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
}

#[test]
fn dry_run_prints_prompt_without_launching() {
    let ws = Workspace::new();
    let marker = ws.root().join("agent-ran");
    ws.fake_agent(&format!("touch '{}'", marker.display()));
    write_file(ws.root(), "prd.json", &flat_json(&[("A", false)]));

    let output = ws.run(&["run", "--dry-run"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let out = stdout(&output);
    assert!(out.contains("Next task [1/1]: A"), "{out}");
    assert!(out.contains("Progress file:"), "{out}");
    assert!(!marker.exists());
    assert!(!ws.progress_path().exists());
}

#[test]
fn config_file_supplies_budget() {
    let ws = Workspace::new();
    ws.fake_agent("exit 0");
    write_file(ws.root(), "prd.json", &flat_json(&[("A", false)]));
    write_file(ws.root(), "taskloop.toml", "max_iterations = 1\n");

    let output = ws.run(&["run", "--color", "never"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(stdout(&output).contains("iteration budget (1)"));
}

#[test]
fn status_reports_counts() {
    let ws = Workspace::new();
    write_file(ws.root(), "prd.json", &flat_json(&[("A", false), ("B", true)]));

    let output = ws.run(&["status"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let out = stdout(&output);
    assert!(out.contains("Completed: 1/2"), "{out}");
    assert!(out.contains("Next: A"), "{out}");
}

#[test]
fn interrupt_during_attempt_exits_130_and_cleans_up() {
    let ws = Workspace::new();
    ws.fake_agent("exec sleep 30");
    write_file(ws.root(), "prd.json", &flat_json(&[("A", false)]));

    let mut child = ws
        .command()
        .arg("run")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn taskloop");

    // The sink appears once the attempt is running and the handler is installed.
    let deadline = Instant::now() + Duration::from_secs(10);
    while ws.scratch_entries() == 0 {
        assert!(Instant::now() < deadline, "attempt never started");
        thread::sleep(Duration::from_millis(50));
    }
    let kill = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .expect("send SIGINT");
    assert!(kill.success());

    let status = child
        .wait_timeout(Duration::from_secs(10))
        .expect("wait")
        .unwrap_or_else(|| {
            let _ = child.kill();
            panic!("taskloop did not exit after SIGINT");
        });
    assert_eq!(status.code(), Some(exit_codes::INTERRUPTED));
    assert_eq!(ws.scratch_entries(), 0);
}

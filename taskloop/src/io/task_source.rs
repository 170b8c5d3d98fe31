//! Task list adapters: one implementation per on-disk format.
//!
//! The format is detected once by [`open_task_source`]; afterwards every query
//! re-reads the file, because the agent edits it between iterations.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::core::invariants::{MissingMarker, tasks_from_entries};
use crate::core::markdown::parse_checkboxes;
use crate::core::selector::{MARKDOWN_LABEL_CHARS, count_tasks, first_open_task, truncate_chars};
use crate::core::types::TaskCounts;
use crate::task::{Task, TaskFormat};

const FLAT_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/flat_tasks.schema.json"
));
const NESTED_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/nested_tasks.schema.json"
));

/// Field holding the task collection in nested task lists.
pub const NESTED_TASKS_FIELD: &str = "userStories";

/// Task list problems that make a run impossible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskSourceError {
    /// Invalid JSON syntax or an unexpected document shape.
    Malformed { path: PathBuf, message: String },
    /// Nested task list without its task collection.
    MissingTaskField { path: PathBuf, field: &'static str },
    /// A task without a boolean completion marker. Only the first is reported.
    MissingMarker {
        path: PathBuf,
        index: usize,
        id: Option<String>,
        description: String,
    },
}

impl fmt::Display for TaskSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskSourceError::Malformed { path, message } => {
                write!(f, "task list {} is malformed: {message}", path.display())
            }
            TaskSourceError::MissingTaskField { path, field } => {
                write!(f, "task list {} has no `{field}` array", path.display())
            }
            TaskSourceError::MissingMarker {
                path,
                index,
                id,
                description,
            } => {
                write!(f, "task at index {index}")?;
                if let Some(id) = id {
                    write!(f, " (id {id})")?;
                }
                if !description.is_empty() {
                    write!(f, " \"{description}\"")?;
                }
                write!(
                    f,
                    " in {} has no boolean `passes` marker",
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for TaskSourceError {}

/// Uniform query surface over a task list file.
///
/// Implementors only parse; counting and selection are shared.
pub trait TaskSource {
    fn format(&self) -> TaskFormat;

    /// Read and parse the current file contents.
    fn load_tasks(&self) -> Result<Vec<Task>>;

    fn counts(&self) -> Result<TaskCounts> {
        Ok(count_tasks(&self.load_tasks()?))
    }

    fn remaining_count(&self) -> Result<usize> {
        Ok(self.counts()?.remaining)
    }

    fn completed_count(&self) -> Result<usize> {
        Ok(self.counts()?.completed)
    }

    /// Label of the first incomplete task, or `None` when all tasks pass.
    fn next_task_label(&self) -> Result<Option<String>> {
        let tasks = self.load_tasks()?;
        Ok(first_open_task(&tasks).map(|task| task.label().to_string()))
    }
}

/// Top-level JSON array of tasks.
#[derive(Debug, Clone)]
pub struct FlatJsonTasks {
    path: PathBuf,
}

impl TaskSource for FlatJsonTasks {
    fn format(&self) -> TaskFormat {
        TaskFormat::FlatJson
    }

    fn load_tasks(&self) -> Result<Vec<Task>> {
        let value = read_json(&self.path)?;
        validate_shape(&self.path, &value, FLAT_SCHEMA)?;
        let entries = value
            .as_array()
            .ok_or_else(|| anyhow!("task list {} is not an array", self.path.display()))?;
        tasks_from_entries(entries).map_err(|missing| missing_marker(&self.path, missing).into())
    }
}

/// JSON object with tasks under `userStories` and agent-only `context` metadata.
#[derive(Debug, Clone)]
pub struct NestedJsonTasks {
    path: PathBuf,
}

impl TaskSource for NestedJsonTasks {
    fn format(&self) -> TaskFormat {
        TaskFormat::NestedJson
    }

    fn load_tasks(&self) -> Result<Vec<Task>> {
        let value = read_json(&self.path)?;
        if value.get(NESTED_TASKS_FIELD).is_none() {
            return Err(TaskSourceError::MissingTaskField {
                path: self.path.clone(),
                field: NESTED_TASKS_FIELD,
            }
            .into());
        }
        validate_shape(&self.path, &value, NESTED_SCHEMA)?;
        let entries = value[NESTED_TASKS_FIELD].as_array().ok_or_else(|| {
            anyhow!(
                "task list {} field `{NESTED_TASKS_FIELD}` is not an array",
                self.path.display()
            )
        })?;
        tasks_from_entries(entries).map_err(|missing| missing_marker(&self.path, missing).into())
    }
}

/// Markdown checkbox list.
#[derive(Debug, Clone)]
pub struct MarkdownTasks {
    path: PathBuf,
}

impl TaskSource for MarkdownTasks {
    fn format(&self) -> TaskFormat {
        TaskFormat::Markdown
    }

    fn load_tasks(&self) -> Result<Vec<Task>> {
        let contents = read_text(&self.path)?;
        Ok(parse_checkboxes(&contents))
    }

    fn next_task_label(&self) -> Result<Option<String>> {
        let tasks = self.load_tasks()?;
        Ok(first_open_task(&tasks).map(|task| truncate_chars(task.label(), MARKDOWN_LABEL_CHARS)))
    }
}

/// Detect the format of `path`, validate its contents, and return its adapter.
///
/// All load-time validation happens here so a bad task list fails the run
/// before anything is launched.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn open_task_source(path: &Path) -> Result<Box<dyn TaskSource>> {
    let format = detect_format(path)?;
    let path = path.to_path_buf();
    let source: Box<dyn TaskSource> = match format {
        TaskFormat::FlatJson => Box::new(FlatJsonTasks { path }),
        TaskFormat::NestedJson => Box::new(NestedJsonTasks { path }),
        TaskFormat::Markdown => Box::new(MarkdownTasks { path }),
    };
    let counts = source.counts()?;
    debug!(
        format = format.as_str(),
        completed = counts.completed,
        remaining = counts.remaining,
        "task list opened"
    );
    Ok(source)
}

/// Markdown by extension; otherwise the top-level JSON value decides.
pub fn detect_format(path: &Path) -> Result<TaskFormat> {
    if is_markdown(path) {
        return Ok(TaskFormat::Markdown);
    }
    match read_json(path)? {
        Value::Array(_) => Ok(TaskFormat::FlatJson),
        Value::Object(_) => Ok(TaskFormat::NestedJson),
        _ => Err(TaskSourceError::Malformed {
            path: path.to_path_buf(),
            message: "expected a JSON array or object at the top level".to_string(),
        }
        .into()),
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("markdown"))
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read task list {}", path.display()))
}

fn read_json(path: &Path) -> Result<Value> {
    let contents = read_text(path)?;
    serde_json::from_str(&contents).map_err(|err| {
        TaskSourceError::Malformed {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
        .into()
    })
}

fn validate_shape(path: &Path, value: &Value, schema: &str) -> Result<()> {
    let schema_value: Value = serde_json::from_str(schema).context("parse task list schema")?;
    let validator = jsonschema::validator_for(&schema_value)
        .map_err(|err| anyhow!("invalid task list schema: {}", err))?;
    let messages: Vec<String> = validator
        .iter_errors(value)
        .map(|err| err.to_string())
        .collect();
    if messages.is_empty() {
        return Ok(());
    }
    Err(TaskSourceError::Malformed {
        path: path.to_path_buf(),
        message: messages.join("; "),
    }
    .into())
}

fn missing_marker(path: &Path, missing: MissingMarker) -> TaskSourceError {
    TaskSourceError::MissingMarker {
        path: path.to_path_buf(),
        index: missing.index,
        id: missing.id,
        description: missing.description,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::UNTITLED_TASK;
    use crate::test_support::{flat_json, markdown_list, nested_json, write_file};

    fn source_error(err: &anyhow::Error) -> &TaskSourceError {
        err.downcast_ref::<TaskSourceError>()
            .expect("expected a TaskSourceError")
    }

    #[test]
    fn flat_scenario_counts_and_label() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = write_file(
            temp.path(),
            "prd.json",
            r#"[{"name":"A","passes":false},{"name":"B","passes":true}]"#,
        );
        let source = open_task_source(&path).expect("open");
        assert_eq!(source.format(), TaskFormat::FlatJson);
        assert_eq!(source.remaining_count().expect("remaining"), 1);
        assert_eq!(source.completed_count().expect("completed"), 1);
        assert_eq!(source.next_task_label().expect("label").as_deref(), Some("A"));
    }

    #[test]
    fn markdown_scenario_counts_and_label() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = write_file(temp.path(), "PRD.md", "# PRD\n\n- [ ] X\n- [x] Y\n");
        let source = open_task_source(&path).expect("open");
        assert_eq!(source.format(), TaskFormat::Markdown);
        assert_eq!(source.remaining_count().expect("remaining"), 1);
        assert_eq!(source.completed_count().expect("completed"), 1);
        assert_eq!(source.next_task_label().expect("label").as_deref(), Some("X"));
    }

    #[test]
    fn equivalent_lists_count_the_same_in_every_format() {
        let tasks = [("a", true), ("b", false), ("c", true), ("d", false), ("e", false)];
        let temp = tempfile::tempdir().expect("tempdir");
        let files = [
            write_file(temp.path(), "flat.json", &flat_json(&tasks)),
            write_file(temp.path(), "nested.json", &nested_json(&tasks)),
            write_file(temp.path(), "tasks.md", &markdown_list(&tasks)),
        ];
        for path in files {
            let source = open_task_source(&path).expect("open");
            let counts = source.counts().expect("counts");
            assert_eq!(counts.completed, 2, "{}", path.display());
            assert_eq!(counts.remaining, 3, "{}", path.display());
            assert_eq!(counts.total(), tasks.len());
            assert_eq!(source.next_task_label().expect("label").as_deref(), Some("b"));
        }
    }

    #[test]
    fn nested_list_reads_user_stories_and_ignores_context() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = write_file(
            temp.path(),
            "prd.json",
            r#"{
                "project": "demo",
                "context": {"patterns": ["use anyhow"], "keyFiles": ["src/lib.rs"], "nonGoals": []},
                "userStories": [
                    {"id": "US-001", "title": "Schema", "passes": true},
                    {"id": "US-002", "description": "Login form", "passes": false}
                ]
            }"#,
        );
        let source = open_task_source(&path).expect("open");
        assert_eq!(source.format(), TaskFormat::NestedJson);
        assert_eq!(
            source.next_task_label().expect("label").as_deref(),
            Some("Login form")
        );
    }

    #[test]
    fn free_form_context_is_accepted() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = write_file(
            temp.path(),
            "prd.json",
            r#"{
                "context": {"patterns": [{"rule": "use anyhow"}], "keyFiles": "src/", "nonGoals": 3},
                "userStories": [{"id": "US-1", "title": "Login", "passes": false}]
            }"#,
        );
        let source = open_task_source(&path).expect("open");
        assert_eq!(source.remaining_count().expect("remaining"), 1);
        assert_eq!(source.next_task_label().expect("label").as_deref(), Some("Login"));
    }

    #[test]
    fn unusual_field_types_fall_back_instead_of_failing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = write_file(
            temp.path(),
            "prd.json",
            r#"[
                {"id": 1.5, "title": null, "passes": true},
                {"id": 2, "title": null, "description": ["not", "text"], "name": "Named", "passes": false},
                {"id": {"nested": true}, "title": 7, "passes": false}
            ]"#,
        );
        let source = open_task_source(&path).expect("open");
        let tasks = source.load_tasks().expect("tasks");
        assert_eq!(tasks[0].id.as_deref(), Some("1.5"));
        assert_eq!(tasks[0].label(), "1.5");
        assert_eq!(tasks[1].label(), "Named");
        assert_eq!(tasks[2].label(), UNTITLED_TASK);
        assert_eq!(source.next_task_label().expect("label").as_deref(), Some("Named"));
    }

    #[test]
    fn label_falls_back_to_id() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = write_file(
            temp.path(),
            "prd.json",
            r#"{"userStories": [{"id": "US-009", "passes": false}]}"#,
        );
        let source = open_task_source(&path).expect("open");
        assert_eq!(
            source.next_task_label().expect("label").as_deref(),
            Some("US-009")
        );
    }

    #[test]
    fn no_label_when_everything_passes() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = write_file(temp.path(), "prd.json", &flat_json(&[("a", true)]));
        let source = open_task_source(&path).expect("open");
        assert_eq!(source.remaining_count().expect("remaining"), 0);
        assert!(source.next_task_label().expect("label").is_none());
    }

    #[test]
    fn empty_lists_are_valid() {
        let temp = tempfile::tempdir().expect("tempdir");
        for (name, contents) in [
            ("flat.json", "[]"),
            ("nested.json", r#"{"userStories": []}"#),
            ("empty.md", "# nothing to do\n"),
        ] {
            let path = write_file(temp.path(), name, contents);
            let source = open_task_source(&path).expect("open");
            assert_eq!(source.counts().expect("counts"), TaskCounts::default());
        }
    }

    #[test]
    fn markdown_label_is_truncated() {
        let temp = tempfile::tempdir().expect("tempdir");
        let long = "word ".repeat(30);
        let path = write_file(temp.path(), "PRD.md", &format!("- [ ] {long}\n"));
        let source = open_task_source(&path).expect("open");
        let label = source.next_task_label().expect("label").expect("some label");
        assert_eq!(label.chars().count(), MARKDOWN_LABEL_CHARS);
    }

    #[test]
    fn queries_reread_the_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = write_file(temp.path(), "prd.json", &flat_json(&[("a", false), ("b", false)]));
        let source = open_task_source(&path).expect("open");
        assert_eq!(source.remaining_count().expect("remaining"), 2);
        assert_eq!(source.remaining_count().expect("remaining again"), 2);

        fs::write(&path, flat_json(&[("a", true), ("b", false)])).expect("rewrite");
        assert_eq!(source.remaining_count().expect("remaining"), 1);
        assert_eq!(source.next_task_label().expect("label").as_deref(), Some("b"));
    }

    #[test]
    fn malformed_json_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = write_file(temp.path(), "prd.json", r#"[{"name": "A", "passes": false"#);
        let err = open_task_source(&path).err().expect("error");
        assert!(matches!(
            source_error(&err),
            TaskSourceError::Malformed { .. }
        ));
    }

    #[test]
    fn scalar_json_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = write_file(temp.path(), "prd.json", "42");
        let err = open_task_source(&path).err().expect("error");
        assert!(matches!(
            source_error(&err),
            TaskSourceError::Malformed { .. }
        ));
    }

    #[test]
    fn flat_entries_must_be_objects() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = write_file(temp.path(), "prd.json", r#"["just a string"]"#);
        let err = open_task_source(&path).err().expect("error");
        assert!(matches!(
            source_error(&err),
            TaskSourceError::Malformed { .. }
        ));
    }

    #[test]
    fn nested_without_task_field_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = write_file(temp.path(), "prd.json", r#"{"stories": []}"#);
        let err = open_task_source(&path).err().expect("error");
        assert_eq!(
            source_error(&err),
            &TaskSourceError::MissingTaskField {
                path: path.clone(),
                field: NESTED_TASKS_FIELD,
            }
        );
    }

    #[test]
    fn missing_marker_reports_first_offender() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = write_file(
            temp.path(),
            "prd.json",
            r#"{"userStories": [
                {"id": "US-1", "title": "ok", "passes": true},
                {"id": "US-2", "title": "broken"},
                {"id": "US-3", "title": "also broken"}
            ]}"#,
        );
        let err = open_task_source(&path).err().expect("error");
        assert_eq!(
            source_error(&err),
            &TaskSourceError::MissingMarker {
                path: path.clone(),
                index: 1,
                id: Some("US-2".to_string()),
                description: "broken".to_string(),
            }
        );
        let message = err.to_string();
        assert!(message.contains("index 1"));
        assert!(message.contains("US-2"));
        assert!(message.contains("broken"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = open_task_source(&temp.path().join("absent.json"))
            .err()
            .expect("error");
        assert!(format!("{err:#}").contains("read task list"));
    }
}

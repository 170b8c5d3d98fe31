//! Prompt text handed to the agent on every attempt.
//!
//! A built-in template is chosen by task list format unless the operator
//! supplied an override. Either way the rendered body is preceded by a fixed
//! preamble naming the task list and progress file.

use std::path::Path;

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use tracing::debug;

use crate::io::init::TaskPaths;
use crate::task::TaskFormat;

const FLAT_JSON_TEMPLATE: &str = include_str!("prompts/flat_json.md");
const NESTED_JSON_TEMPLATE: &str = include_str!("prompts/nested_json.md");
const MARKDOWN_TEMPLATE: &str = include_str!("prompts/markdown.md");

/// Renders prompts from built-in templates or one operator override.
pub struct PromptBuilder {
    env: Environment<'static>,
    override_source: Option<String>,
}

impl PromptBuilder {
    /// Compile the built-in templates and, if given, check that the override
    /// renders.
    pub fn new(override_source: Option<String>) -> Result<Self> {
        let mut env = Environment::new();
        env.add_template(TaskFormat::FlatJson.as_str(), FLAT_JSON_TEMPLATE)
            .context("compile flat-json prompt template")?;
        env.add_template(TaskFormat::NestedJson.as_str(), NESTED_JSON_TEMPLATE)
            .context("compile nested-json prompt template")?;
        env.add_template(TaskFormat::Markdown.as_str(), MARKDOWN_TEMPLATE)
            .context("compile markdown prompt template")?;

        if let Some(source) = override_source.as_deref() {
            env.render_str(
                source,
                context! { progress_file => "progress.txt", task_file => "prd.json" },
            )
            .context("render prompt override")?;
            debug!("prompt override accepted");
        }
        Ok(Self {
            env,
            override_source,
        })
    }

    /// Read an override template from disk and build with it.
    pub fn from_override_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("read prompt template {}", path.display()))?;
        Self::new(Some(source))
            .with_context(|| format!("invalid prompt template {}", path.display()))
    }

    /// Full prompt for one attempt against a list of `format`.
    pub fn build(&self, format: TaskFormat, paths: &TaskPaths) -> Result<String> {
        let task_file = paths.task_path.display().to_string();
        let progress_file = paths.progress_path.display().to_string();
        let ctx = context! { progress_file => &progress_file, task_file => &task_file };

        let body = match self.override_source.as_deref() {
            Some(source) => self
                .env
                .render_str(source, ctx)
                .context("render prompt override")?,
            None => self
                .env
                .get_template(format.as_str())?
                .render(ctx)
                .with_context(|| format!("render {} prompt", format.as_str()))?,
        };
        Ok(format!(
            "Task list: {task_file}\nProgress file: {progress_file}\n\n{}",
            body.trim_end()
        ))
    }
}

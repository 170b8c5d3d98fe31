/// Label used when a task carries neither a description nor an id.
pub const UNTITLED_TASK: &str = "Untitled task";

/// Backing representation of a task list. Fixed when the list is opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskFormat {
    /// Top-level JSON array of task objects.
    FlatJson,
    /// JSON object with a `userStories` array and optional `context` metadata.
    NestedJson,
    /// Markdown checkbox list.
    Markdown,
}

impl TaskFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskFormat::FlatJson => "flat-json",
            TaskFormat::NestedJson => "nested-json",
            TaskFormat::Markdown => "markdown",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    pub id: Option<String>,
    pub description: String,
    pub passes: bool,
}

impl Task {
    /// Display label: description, then id, then [`UNTITLED_TASK`].
    pub fn label(&self) -> &str {
        let description = self.description.trim();
        if !description.is_empty() {
            return description;
        }
        match self.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id,
            _ => UNTITLED_TASK,
        }
    }
}

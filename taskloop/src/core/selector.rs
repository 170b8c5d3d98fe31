//! Deterministic selection logic over a loaded task list.

use crate::core::types::TaskCounts;
use crate::task::Task;

/// Markdown task labels are clipped to this many characters.
pub const MARKDOWN_LABEL_CHARS: usize = 60;

/// First task with `passes=false`, in source order.
///
/// Returns `None` if every task passes (list is complete).
pub fn first_open_task(tasks: &[Task]) -> Option<&Task> {
    tasks.iter().find(|task| !task.passes)
}

pub fn count_tasks(tasks: &[Task]) -> TaskCounts {
    let completed = tasks.iter().filter(|task| task.passes).count();
    TaskCounts {
        completed,
        remaining: tasks.len() - completed,
    }
}

/// Clip `text` to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return text.chars().take(max_chars).collect();
    }
    let mut clipped: String = text.chars().take(max_chars - 3).collect();
    clipped.push_str("...");
    clipped
}

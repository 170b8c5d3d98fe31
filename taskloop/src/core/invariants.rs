//! Load-time checks over raw JSON task entries.
//!
//! Every JSON task must carry a boolean `passes` marker. Entries without one
//! are not skipped: the first offender is reported so the operator can find it.

use serde_json::Value;

use crate::task::Task;

/// Fields tried, in order, for a task's human-readable description.
const DESCRIPTION_FIELDS: [&str; 3] = ["title", "description", "name"];

/// First task entry that lacks a boolean `passes` marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingMarker {
    /// 0-based position in the task collection.
    pub index: usize,
    pub id: Option<String>,
    pub description: String,
}

/// Convert JSON task entries into tasks, stopping at the first entry without a marker.
pub fn tasks_from_entries(entries: &[Value]) -> Result<Vec<Task>, MissingMarker> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let id = entry_id(entry);
            let description = entry_description(entry);
            match entry.get("passes").and_then(Value::as_bool) {
                Some(passes) => Ok(Task {
                    id,
                    description,
                    passes,
                }),
                None => Err(MissingMarker {
                    index,
                    id,
                    description,
                }),
            }
        })
        .collect()
}

fn entry_id(entry: &Value) -> Option<String> {
    match entry.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn entry_description(entry: &Value) -> String {
    DESCRIPTION_FIELDS
        .iter()
        .filter_map(|field| entry.get(*field).and_then(Value::as_str))
        .map(str::trim)
        .find(|text| !text.is_empty())
        .unwrap_or_default()
        .to_string()
}

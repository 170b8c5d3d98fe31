//! Checkbox-list parsing for Markdown task lists.

use std::sync::LazyLock;

use regex::Regex;

use crate::task::Task;

static CHECKBOX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[-*+]\s+\[([ xX])\](?:\s+(.*))?$").expect("checkbox pattern is valid")
});

/// Parse every checkbox line (`- [ ] ...`, `- [x] ...`) into a task, in source order.
///
/// Lines without a checkbox are prose and are ignored.
pub fn parse_checkboxes(contents: &str) -> Vec<Task> {
    contents
        .lines()
        .filter_map(|line| CHECKBOX_RE.captures(line))
        .map(|caps| {
            let passes = caps.get(1).is_some_and(|mark| mark.as_str() != " ");
            let description = caps
                .get(2)
                .map(|text| text.as_str().trim().to_string())
                .unwrap_or_default();
            Task {
                id: None,
                description,
                passes,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_checked_and_unchecked_lines() {
        let tasks = parse_checkboxes("# Tasks\n\n- [ ] X\n- [x] Y\n* [X] Z\n");
        let summary: Vec<(&str, bool)> = tasks
            .iter()
            .map(|task| (task.description.as_str(), task.passes))
            .collect();
        assert_eq!(summary, vec![("X", false), ("Y", true), ("Z", true)]);
    }

    #[test]
    fn ignores_prose_and_plain_bullets() {
        let tasks = parse_checkboxes("Intro text\n- plain bullet\n-[ ] no space\n  - [ ] nested\n");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].description, "nested");
    }

    #[test]
    fn empty_checkbox_has_empty_description() {
        let tasks = parse_checkboxes("- [ ]\n");
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].description.is_empty());
        assert!(!tasks[0].passes);
    }

    #[test]
    fn handles_crlf_line_endings() {
        let tasks = parse_checkboxes("- [ ] first\r\n- [x] second\r\n");
        assert_eq!(tasks[0].description, "first");
        assert!(tasks[1].passes);
    }
}

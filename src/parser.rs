use crate::timestamp::parse_due;
use chrono::{DateTime, Utc};
use regex::Regex;

#[derive(Debug, PartialEq)]
pub struct ParsedTask {
    pub title: String,
    pub due_at: Option<DateTime<Utc>>,
}

/// Pulls an `@2024-01-01T09:00` style due token out of a quick-add title.
pub fn parse_task_input(input: &str) -> ParsedTask {
    let due_re = Regex::new(r"@(\d{4}-\d{2}-\d{2}(?:T\d{2}:\d{2}(?::\d{2})?)?)\s*").unwrap();

    let mut due_at = None;

    // Due
    for caps in due_re.captures_iter(input) {
        if let Some(due_match) = caps.get(1) {
            if let Some(parsed) = parse_due(due_match.as_str()) {
                if due_at.is_none() {
                    due_at = Some(parsed);
                }
            }
        }
    }

    let title = due_re.replace_all(input, "").to_string();

    let title = Regex::new(r"\s+")
        .unwrap()
        .replace_all(&title, " ")
        .trim()
        .to_string();

    ParsedTask { title, due_at }
}

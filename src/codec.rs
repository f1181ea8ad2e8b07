// Persisted blob format: one JSON array of tasks

use crate::task::Task;
use eyre::{Context, Result, eyre};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Serialize the full task sequence into the persisted blob
pub fn encode_tasks(tasks: &[Task]) -> Result<String> {
    serde_json::to_string(tasks).context("Failed to serialize task list")
}

/// Result of decoding a blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTasks {
    pub tasks: Vec<Task>,
    /// Array elements left out: undecodable entries and repeated ids
    pub skipped: usize,
}

impl DecodedTasks {
    /// True if every element of the array made it into `tasks`
    pub fn is_complete(&self) -> bool {
        self.skipped == 0
    }
}

/// Parse a persisted blob back into a task sequence
///
/// Fails only if the blob is not a JSON array at all. Elements that do not
/// decode as a task are skipped, later duplicates of an id are dropped, and
/// each task is normalized so `doneAt` agrees with `status`. Skipped elements
/// are counted in [`DecodedTasks::skipped`].
pub fn decode_tasks(raw: &str) -> Result<DecodedTasks> {
    let value: Value = serde_json::from_str(raw).context("Task blob is not valid JSON")?;

    let items = match value {
        Value::Array(items) => items,
        other => return Err(eyre!("Task blob is not a JSON array (found {})", kind(&other))),
    };

    let total = items.len();
    let mut seen = HashSet::new();
    let mut tasks = Vec::with_capacity(total);

    for (index, item) in items.into_iter().enumerate() {
        let mut task: Task = match serde_json::from_value(item) {
            Ok(t) => t,
            Err(e) => {
                warn!(index, error = %e, "Failed to decode task, skipping");
                continue;
            }
        };

        if !seen.insert(task.id.clone()) {
            warn!(index, id = %task.id, "Duplicate task id, keeping first occurrence");
            continue;
        }

        if task.normalize() {
            debug!(id = %task.id, status = %task.status, "Repaired doneAt to match status");
        }

        tasks.push(task);
    }

    let skipped = total - tasks.len();
    debug!(total, loaded = tasks.len(), skipped, "Decoded task blob");
    Ok(DecodedTasks { tasks, skipped })
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;
    use chrono::{TimeZone, Utc};

    fn sample() -> Vec<Task> {
        let t0 = Utc.with_ymd_and_hms(2026, 5, 1, 7, 30, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2026, 5, 2, 18, 5, 12).unwrap();

        let mut done = Task::new("Pay rent", t0);
        done.set_status(TaskStatus::Done, t1);
        let todo = Task::new("Call plumber", t1);
        vec![todo, done]
    }

    #[test]
    fn test_encode_decode_preserves_sequence() {
        let tasks = sample();
        let blob = encode_tasks(&tasks).unwrap();
        let decoded = decode_tasks(&blob).unwrap();
        assert_eq!(decoded.tasks, tasks);
        assert!(decoded.is_complete());
    }

    #[test]
    fn test_encode_empty() {
        assert_eq!(encode_tasks(&[]).unwrap(), "[]");
        assert!(decode_tasks("[]").unwrap().tasks.is_empty());
    }

    #[test]
    fn test_decode_rejects_non_array() {
        assert!(decode_tasks("{\"id\":\"x\"}").is_err());
        assert!(decode_tasks("not json").is_err());
        assert!(decode_tasks("").is_err());
    }

    #[test]
    fn test_decode_skips_malformed_elements() {
        let blob = r#"[
            {"id":"a","title":"Valid","status":"todo","createdAt":"2026-05-01T07:30:00.000Z","doneAt":null},
            {"id":"b","title":"Bad status","status":"doing","createdAt":"2026-05-01T07:30:00.000Z","doneAt":null},
            42,
            {"id":"c","title":"Also valid","status":"done","createdAt":"2026-05-01T07:30:00.000Z","doneAt":"2026-05-02T09:00:00.000Z"}
        ]"#;

        let decoded = decode_tasks(blob).unwrap();
        let ids: Vec<&str> = decoded.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(decoded.skipped, 2);
        assert!(!decoded.is_complete());
    }

    #[test]
    fn test_decode_drops_duplicate_ids() {
        let blob = r#"[
            {"id":"a","title":"First","status":"todo","createdAt":"2026-05-01T07:30:00.000Z","doneAt":null},
            {"id":"a","title":"Second","status":"todo","createdAt":"2026-05-01T07:30:00.000Z","doneAt":null}
        ]"#;

        let decoded = decode_tasks(blob).unwrap();
        assert_eq!(decoded.tasks.len(), 1);
        assert_eq!(decoded.tasks[0].title, "First");
        assert_eq!(decoded.skipped, 1);
    }

    #[test]
    fn test_decode_normalizes_done_at() {
        let blob = r#"[
            {"id":"a","title":"Todo with stamp","status":"todo","createdAt":"2026-05-01T07:30:00.000Z","doneAt":"2026-05-02T09:00:00.000Z"},
            {"id":"b","title":"Done without stamp","status":"done","createdAt":"2026-05-01T07:30:00.000Z","doneAt":null}
        ]"#;

        let tasks = decode_tasks(blob).unwrap().tasks;
        assert!(tasks[0].done_at.is_none());
        assert_eq!(tasks[1].done_at, Some(tasks[1].created_at));
    }
}

// Data model for board items

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Board column a task sits in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Todo,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::Done => "done",
        }
    }

    /// Column heading shown on the board
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "To Do",
            TaskStatus::Done => "Done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "todo" => Ok(TaskStatus::Todo),
            "done" => Ok(TaskStatus::Done),
            other => Err(eyre::eyre!("Unknown task status: {} (expected todo or done)", other)),
        }
    }
}

/// One board item
///
/// `done_at` is present exactly when `status` is [`TaskStatus::Done`]. The
/// store keeps that invariant; use [`Task::set_status`] rather than writing
/// the two fields separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "iso_millis_opt", default)]
    pub done_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a fresh `todo` task with a new UUIDv7 id
    pub fn new(title: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            title: title.trim().to_string(),
            status: TaskStatus::Todo,
            created_at: now,
            done_at: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }

    /// Move the task to `status`, stamping or clearing `done_at`
    pub fn set_status(&mut self, status: TaskStatus, now: DateTime<Utc>) {
        self.status = status;
        self.done_at = match status {
            TaskStatus::Done => Some(now),
            TaskStatus::Todo => None,
        };
    }

    /// Repair a decoded task so `done_at` agrees with `status`
    ///
    /// Returns true if anything changed.
    pub(crate) fn normalize(&mut self) -> bool {
        match (self.status, self.done_at) {
            (TaskStatus::Todo, Some(_)) => {
                self.done_at = None;
                true
            }
            (TaskStatus::Done, None) => {
                self.done_at = Some(self.created_at);
                true
            }
            _ => false,
        }
    }
}

/// Tasks of one board column, in board order
pub fn column(tasks: &[Task], status: TaskStatus) -> Vec<&Task> {
    tasks.iter().filter(|t| t.status == status).collect()
}

/// RFC 3339 timestamps with millisecond precision and a `Z` suffix
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(D::Error::custom)
    }

    pub(super) fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(raw).map(|ts| ts.with_timezone(&Utc))
    }
}

mod iso_millis_opt {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(ts: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| super::iso_millis::parse(&s).map_err(D::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, h, m, 0).unwrap()
    }

    #[test]
    fn test_new_task_is_todo_and_trimmed() {
        let task = Task::new("  Buy milk \n", at(9, 0));
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.created_at, at(9, 0));
        assert!(task.done_at.is_none());
        assert!(!task.id.is_empty());
    }

    #[test]
    fn test_new_tasks_get_distinct_ids() {
        let a = Task::new("a", at(9, 0));
        let b = Task::new("b", at(9, 0));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_set_status_round_trip() {
        let mut task = Task::new("Write report", at(9, 0));
        let before = task.clone();

        task.set_status(TaskStatus::Done, at(10, 30));
        assert!(task.is_done());
        assert_eq!(task.done_at, Some(at(10, 30)));

        task.set_status(TaskStatus::Todo, at(11, 0));
        assert_eq!(task, before);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&TaskStatus::Todo).unwrap(), "\"todo\"");
        assert_eq!(serde_json::to_string(&TaskStatus::Done).unwrap(), "\"done\"");
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("todo".parse::<TaskStatus>().unwrap(), TaskStatus::Todo);
        assert_eq!(" DONE ".parse::<TaskStatus>().unwrap(), TaskStatus::Done);
        assert!("doing".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_task_wire_shape() {
        let mut task = Task::new("Ship it", at(8, 15));
        task.id = "t-1".to_string();

        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["id"], "t-1");
        assert_eq!(json["title"], "Ship it");
        assert_eq!(json["status"], "todo");
        assert_eq!(json["createdAt"], "2026-03-14T08:15:00.000Z");
        assert!(json["doneAt"].is_null());

        task.set_status(TaskStatus::Done, at(9, 45));
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["doneAt"], "2026-03-14T09:45:00.000Z");
    }

    #[test]
    fn test_deserialize_accepts_offsets_and_missing_done_at() {
        let json = r#"{"id":"x","title":"T","status":"todo","createdAt":"2026-03-14T10:15:00.000+02:00"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.created_at, at(8, 15));
        assert!(task.done_at.is_none());
    }

    #[test]
    fn test_normalize() {
        let mut task = Task::new("x", at(9, 0));
        task.done_at = Some(at(10, 0));
        assert!(task.normalize());
        assert!(task.done_at.is_none());

        task.status = TaskStatus::Done;
        assert!(task.normalize());
        assert_eq!(task.done_at, Some(at(9, 0)));

        assert!(!task.normalize());
    }

    #[test]
    fn test_column_keeps_order() {
        let mut a = Task::new("a", at(9, 0));
        let b = Task::new("b", at(9, 1));
        let c = Task::new("c", at(9, 2));
        a.set_status(TaskStatus::Done, at(10, 0));
        let tasks = vec![c, a, b];

        let todo: Vec<&str> = column(&tasks, TaskStatus::Todo).iter().map(|t| t.title.as_str()).collect();
        assert_eq!(todo, vec!["c", "b"]);
        assert_eq!(column(&tasks, TaskStatus::Done).len(), 1);
        assert!(column(&[], TaskStatus::Done).is_empty());
    }
}

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "todo")]
    ToDo,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
}

impl Status {
    /// Column order on the board.
    pub const ALL: [Status; 3] = [Status::ToDo, Status::InProgress, Status::Completed];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::ToDo => "todo",
            Status::InProgress => "in-progress",
            Status::Completed => "completed",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Status::ToDo => "To Do",
            Status::InProgress => "In Progress",
            Status::Completed => "Completed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "todo" | "to-do" => Ok(Status::ToDo),
            "in-progress" | "doing" => Ok(Status::InProgress),
            "completed" | "done" => Ok(Status::Completed),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn next(self) -> Priority {
        match self {
            Priority::Low => Priority::Medium,
            Priority::Medium => Priority::High,
            Priority::High => Priority::Low,
        }
    }

    pub fn prev(self) -> Priority {
        match self {
            Priority::Low => Priority::High,
            Priority::Medium => Priority::Low,
            Priority::High => Priority::Medium,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority '{other}'")),
        }
    }
}

/// Opaque task identifier: `task-<unix millis>-<7 base36 chars>`.
///
/// Uniqueness rests on the millisecond timestamp plus ~36 bits of randomness.
/// Collisions are unlikely, not impossible; this is not a secure identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 7;

impl TaskId {
    pub fn generate(now: DateTime<Utc>) -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..ID_SUFFIX_LEN)
            .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect();
        TaskId(format!("task-{}-{}", now.timestamp_millis(), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        TaskId(value.to_string())
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        TaskId(value)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub status: Status,
    pub priority: Priority,
    #[serde(with = "optional_date")]
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// The editable fields of a task, as accepted by create and update.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
}

/// `dueDate` is persisted as `YYYY-MM-DD`, with `""` meaning no due date.
mod optional_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => s.serialize_str(&d.format(FORMAT).to_string()),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw = Option::<String>::deserialize(d)?.unwrap_or_default();
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        NaiveDate::parse_from_str(raw, FORMAT)
            .map(Some)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn sample() -> Task {
        Task {
            id: TaskId::from("task-1700000000000-abc1234"),
            title: "Buy milk".into(),
            description: String::new(),
            status: Status::InProgress,
            priority: Priority::High,
            due_date: NaiveDate::from_ymd_opt(2025, 3, 9),
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap(),
        }
    }

    #[test]
    fn generated_id_has_time_and_suffix() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id = TaskId::generate(now);
        let expected_prefix = format!("task-{}-", now.timestamp_millis());
        assert!(id.as_str().starts_with(&expected_prefix));

        let suffix = &id.as_str()[expected_prefix.len()..];
        assert_eq!(suffix.len(), ID_SUFFIX_LEN);
        assert!(suffix.bytes().all(|b| ID_ALPHABET.contains(&b)));
    }

    #[test]
    fn ids_generated_in_the_same_millisecond_differ() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert_ne!(TaskId::generate(now), TaskId::generate(now));
    }

    #[test]
    fn serializes_with_camel_case_and_plain_date() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["status"], "in-progress");
        assert_eq!(json["priority"], "high");
        assert_eq!(json["dueDate"], "2025-03-09");
        assert!(json["createdAt"].as_str().unwrap().starts_with("2025-03-01T08:30:00"));
    }

    #[test]
    fn empty_due_date_round_trips_as_none() {
        let mut task = sample();
        task.due_date = None;
        let json = serde_json::to_string(&task).unwrap();
        assert!(json.contains(r#""dueDate":"""#));
        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn unknown_status_is_rejected_on_load() {
        let json = serde_json::to_string(&sample())
            .unwrap()
            .replace("in-progress", "archived");
        assert!(serde_json::from_str::<Task>(&json).is_err());
    }

    #[rstest]
    #[case("todo", Status::ToDo)]
    #[case("In-Progress", Status::InProgress)]
    #[case("done", Status::Completed)]
    fn status_parses_from_cli_words(#[case] raw: &str, #[case] expected: Status) {
        assert_eq!(raw.parse::<Status>().unwrap(), expected);
    }

    #[test]
    fn priority_cycles_through_all_values() {
        let mut p = Priority::Low;
        for _ in 0..Priority::ALL.len() {
            p = p.next();
        }
        assert_eq!(p, Priority::Low);
        assert_eq!(Priority::Low.prev(), Priority::High);
    }
}

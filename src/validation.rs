//! Checks on add/edit form input before anything touches the board.

use std::fmt;

use chrono::NaiveDate;

use crate::task::{Priority, TaskDraft};

pub const TITLE_MIN_CHARS: usize = 3;
pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 500;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Raw form input. `due_date` is the text typed by the user, empty for none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormPayload {
    pub title: String,
    pub description: String,
    pub due_date: String,
    pub priority: Priority,
}

/// One message per failing field; all `None` means the payload is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
}

impl FormErrors {
    pub fn is_valid(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.due_date.is_none()
    }

    pub fn messages(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("title", self.title.as_deref()),
            ("description", self.description.as_deref()),
            ("due date", self.due_date.as_deref()),
        ]
        .into_iter()
        .filter_map(|(field, msg)| msg.map(|m| (field, m)))
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self
            .messages()
            .map(|(field, msg)| format!("{field}: {msg}"))
            .collect();
        f.write_str(&joined.join("; "))
    }
}

fn parse_due_date(raw: &str) -> Result<Option<NaiveDate>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map(Some)
        .map_err(|_| "Due date must be a date like 2025-01-31".to_string())
}

impl FormPayload {
    /// Every field is checked; `today` is the current local calendar day.
    pub fn validate(&self, today: NaiveDate) -> FormErrors {
        let mut errors = FormErrors::default();

        let title_len = self.title.trim().chars().count();
        if title_len == 0 {
            errors.title = Some("Task title is required".into());
        } else if title_len < TITLE_MIN_CHARS {
            errors.title = Some(format!(
                "Title is too short: it must be at least {TITLE_MIN_CHARS} characters"
            ));
        } else if title_len > TITLE_MAX_CHARS {
            errors.title = Some(format!(
                "Title is too long: it must be at most {TITLE_MAX_CHARS} characters"
            ));
        }

        if self.description.trim().chars().count() > DESCRIPTION_MAX_CHARS {
            errors.description = Some(format!(
                "Description must be at most {DESCRIPTION_MAX_CHARS} characters"
            ));
        }

        match parse_due_date(&self.due_date) {
            Ok(Some(due)) if due < today => {
                errors.due_date = Some("Due date cannot be in the past".into());
            }
            Ok(_) => {}
            Err(msg) => errors.due_date = Some(msg),
        }

        errors
    }

    /// Validates, then hands back the fields in the shape the board accepts.
    pub fn into_draft(self, today: NaiveDate) -> Result<TaskDraft, FormErrors> {
        let errors = self.validate(today);
        if !errors.is_valid() {
            return Err(errors);
        }
        let due_date = parse_due_date(&self.due_date).map_err(|msg| FormErrors {
            due_date: Some(msg),
            ..FormErrors::default()
        })?;
        Ok(TaskDraft {
            title: self.title,
            description: self.description,
            priority: self.priority,
            due_date,
        })
    }
}

//! Per-card display facts derived from a task and the current time.
//!
//! Nothing here is stored: overdue and due-soon are recomputed against the
//! clock on every draw, so a card goes red the moment its date passes.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use ratatui::style::Color;

use crate::task::{Priority, Status, Task, TaskId};

pub const DEFAULT_DUE_SOON_DAYS: i64 = 2;

const MS_PER_DAY: i64 = 86_400_000;
const WEEK_DAYS: i64 = 7;
const SHORT_DATE: &str = "%b %-d";

/// A due date counts from the start of its local day.
fn due_start(due: NaiveDate) -> NaiveDateTime {
    due.and_time(NaiveTime::MIN)
}

pub fn is_overdue<Tz: TimeZone>(task: &Task, now: &DateTime<Tz>) -> bool {
    match task.due_date {
        Some(due) => task.status != Status::Completed && due_start(due) < now.naive_local(),
        None => false,
    }
}

/// Whole days until the due date, rounded up.
fn days_until(due: NaiveDate, now: NaiveDateTime) -> i64 {
    let ms = (due_start(due) - now).num_milliseconds();
    ms.div_euclid(MS_PER_DAY) + i64::from(ms.rem_euclid(MS_PER_DAY) != 0)
}

pub fn is_due_soon<Tz: TimeZone>(task: &Task, now: &DateTime<Tz>, threshold_days: i64) -> bool {
    let Some(due) = task.due_date else {
        return false;
    };
    if task.status == Status::Completed || is_overdue(task, now) {
        return false;
    }
    (0..=threshold_days).contains(&days_until(due, now.naive_local()))
}

pub fn elapsed_label<Tz: TimeZone>(created_at: DateTime<Utc>, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let elapsed = now.with_timezone(&Utc) - created_at;
    let mins = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if mins < 1 {
        "just now".to_string()
    } else if mins < 60 {
        format!("{mins}m ago")
    } else if hours < 24 {
        format!("{hours}h ago")
    } else if days < WEEK_DAYS {
        format!("{days}d ago")
    } else {
        created_at
            .with_timezone(&now.timezone())
            .format(SHORT_DATE)
            .to_string()
    }
}

pub fn due_label(due: NaiveDate) -> String {
    due.format(SHORT_DATE).to_string()
}

/// 1-based position in the board, zero-padded to three digits.
/// Display only: it shifts whenever earlier tasks are deleted.
pub fn sequence_number(tasks: &[Task], id: &TaskId) -> String {
    let position = tasks.iter().position(|t| &t.id == id).map_or(0, |i| i + 1);
    format!("{position:03}")
}

pub fn count_label(count: usize) -> String {
    if count == 1 {
        "1 task".to_string()
    } else {
        format!("{count} tasks")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityStyle {
    pub label: &'static str,
    pub color: Color,
}

pub fn priority_style(priority: Priority) -> PriorityStyle {
    match priority {
        Priority::High => PriorityStyle {
            label: "High Priority",
            color: Color::Red,
        },
        Priority::Medium => PriorityStyle {
            label: "Medium",
            color: Color::Yellow,
        },
        Priority::Low => PriorityStyle {
            label: "Low",
            color: Color::Blue,
        },
    }
}

pub fn status_color(status: Status) -> Color {
    match status {
        Status::ToDo => Color::Gray,
        Status::InProgress => Color::Yellow,
        Status::Completed => Color::Green,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView<'a> {
    pub task: &'a Task,
    pub number: String,
    pub overdue: bool,
    pub due_soon: bool,
    pub done: bool,
    pub due_label: Option<String>,
    pub elapsed: String,
    pub priority: PriorityStyle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnView<'a> {
    pub status: Status,
    pub title: &'static str,
    pub count_label: String,
    pub cards: Vec<CardView<'a>>,
}

pub fn card_view<'a, Tz: TimeZone>(
    tasks: &'a [Task],
    task: &'a Task,
    now: &DateTime<Tz>,
    due_soon_days: i64,
) -> CardView<'a>
where
    Tz::Offset: std::fmt::Display,
{
    CardView {
        task,
        number: sequence_number(tasks, &task.id),
        overdue: is_overdue(task, now),
        due_soon: is_due_soon(task, now, due_soon_days),
        done: task.status == Status::Completed,
        due_label: task.due_date.map(due_label),
        elapsed: elapsed_label(task.created_at, now),
        priority: priority_style(task.priority),
    }
}

/// One column per status, cards in board order.
pub fn build_columns<'a, Tz: TimeZone>(
    tasks: &'a [Task],
    now: &DateTime<Tz>,
    due_soon_days: i64,
) -> Vec<ColumnView<'a>>
where
    Tz::Offset: std::fmt::Display,
{
    Status::ALL
        .iter()
        .map(|&status| {
            let cards: Vec<CardView<'a>> = tasks
                .iter()
                .filter(|t| t.status == status)
                .map(|t| card_view(tasks, t, now, due_soon_days))
                .collect();
            ColumnView {
                status,
                title: status.title(),
                count_label: count_label(cards.len()),
                cards,
            }
        })
        .collect()
}

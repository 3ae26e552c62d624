use std::io::Write;
use std::path::PathBuf;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

use crate::clock::Clock;
use crate::error::AppError;
use crate::kanban_board::KanbanBoard;
use crate::logging::DEFAULT_LOG_LEVEL;
use crate::presentation::{self, build_columns, DEFAULT_DUE_SOON_DAYS};
use crate::storage::{KeyValueStore, DEFAULT_STORAGE_KEY};
use crate::task::{Priority, Status, TaskId};
use crate::validation::FormPayload;

fn id_arg() -> Arg {
    Arg::new("id").required(true).help("Task id, as shown by `list`")
}

fn priority_arg() -> Arg {
    Arg::new("priority")
        .short('p')
        .long("priority")
        .value_parser(value_parser!(Priority))
        .help("low, medium or high")
}

fn due_arg() -> Arg {
    Arg::new("due")
        .long("due")
        .help("Due date (YYYY-MM-DD); pass \"\" to clear")
}

fn description_arg() -> Arg {
    Arg::new("description")
        .short('d')
        .long("description")
        .help("Task description")
}

pub fn command() -> Command {
    Command::new("taskboard")
        .version(env!("CARGO_PKG_VERSION"))
        .about(
            "Three-column Kanban board for the terminal. \
             Runs the board UI when no subcommand is given.",
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .global(true)
                .env("TASKBOARD_DATA_DIR")
                .value_parser(value_parser!(PathBuf))
                .help("Directory holding the stored tasks and the log file"),
        )
        .arg(
            Arg::new("storage-key")
                .long("storage-key")
                .global(true)
                .env("TASKBOARD_STORAGE_KEY")
                .default_value(DEFAULT_STORAGE_KEY)
                .help("Key the task list is stored under"),
        )
        .arg(
            Arg::new("due-soon-days")
                .long("due-soon-days")
                .global(true)
                .env("TASKBOARD_DUE_SOON_DAYS")
                .value_parser(value_parser!(i64).range(0..=365))
                .help(format!(
                    "Days ahead a due date counts as due soon (default {DEFAULT_DUE_SOON_DAYS})"
                )),
        )
        .arg(
            Arg::new("quota-bytes")
                .long("quota-bytes")
                .global(true)
                .env("TASKBOARD_QUOTA_BYTES")
                .value_parser(value_parser!(usize))
                .help("Largest stored value accepted, in bytes (default 5 MiB)"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .env("TASKBOARD_LOG")
                .default_value(DEFAULT_LOG_LEVEL)
                .help("Log filter, e.g. debug or taskboard=trace"),
        )
        .subcommand(
            Command::new("add")
                .about("Add a task to To Do")
                .arg(Arg::new("title").required(true).help("Task title"))
                .arg(description_arg())
                .arg(priority_arg().default_value("medium"))
                .arg(due_arg()),
        )
        .subcommand(
            Command::new("list").about("List tasks by column").arg(
                Arg::new("status")
                    .short('s')
                    .long("status")
                    .value_parser(value_parser!(Status))
                    .help("Only this column: todo, in-progress or completed"),
            ),
        )
        .subcommand(
            Command::new("move")
                .about("Move a task to another column")
                .arg(id_arg())
                .arg(
                    Arg::new("status")
                        .required(true)
                        .value_parser(value_parser!(Status))
                        .help("todo, in-progress or completed"),
                ),
        )
        .subcommand(
            Command::new("edit")
                .about("Edit a task's title, description, priority or due date")
                .arg(id_arg())
                .arg(Arg::new("title").short('t').long("title").help("New title"))
                .arg(description_arg())
                .arg(priority_arg())
                .arg(due_arg()),
        )
        .subcommand(Command::new("delete").about("Delete a task").arg(id_arg()))
        .subcommand(Command::new("stats").about("Show per-column counts"))
        .subcommand(
            Command::new("clear").about("Delete every task").arg(
                Arg::new("yes")
                    .long("yes")
                    .action(ArgAction::SetTrue)
                    .help("Required, to avoid clearing by accident"),
            ),
        )
}

/// Runs one non-interactive subcommand against `board`, writing to `out`.
pub fn run_subcommand<S: KeyValueStore, C: Clock>(
    board: &mut KanbanBoard<S, C>,
    name: &str,
    matches: &ArgMatches,
    due_soon_days: i64,
    out: &mut impl Write,
) -> Result<(), AppError> {
    let today = board.clock().local_now().date_naive();

    match name {
        "add" => {
            let payload = FormPayload {
                title: string_arg(matches, "title").unwrap_or_default(),
                description: string_arg(matches, "description").unwrap_or_default(),
                due_date: string_arg(matches, "due").unwrap_or_default(),
                priority: matches.get_one::<Priority>("priority").copied().unwrap_or_default(),
            };
            let draft = payload.into_draft(today).map_err(AppError::Validation)?;
            let id = board.add_task(draft);
            writeln!(out, "Task added successfully! ({id})")?;
        }
        "list" => {
            let only = matches.get_one::<Status>("status").copied();
            write_columns(board, only, due_soon_days, out)?;
        }
        "move" => {
            let id = task_id(matches);
            let status = matches
                .get_one::<Status>("status")
                .copied()
                .unwrap_or(Status::ToDo);
            if board.update_status(&id, status) {
                writeln!(out, "Moved {id} to {}", status.title())?;
            } else {
                writeln!(out, "No task with id {id}")?;
            }
        }
        "edit" => {
            let id = task_id(matches);
            let Some(current) = board.find_by_id(&id) else {
                writeln!(out, "No task with id {id}")?;
                return Ok(());
            };
            let payload = FormPayload {
                title: string_arg(matches, "title").unwrap_or_else(|| current.title.clone()),
                description: string_arg(matches, "description")
                    .unwrap_or_else(|| current.description.clone()),
                due_date: string_arg(matches, "due").unwrap_or_else(|| {
                    current
                        .due_date
                        .map(|d| d.format("%Y-%m-%d").to_string())
                        .unwrap_or_default()
                }),
                priority: matches
                    .get_one::<Priority>("priority")
                    .copied()
                    .unwrap_or(current.priority),
            };
            let draft = payload.into_draft(today).map_err(AppError::Validation)?;
            if board.update_task(&id, draft) {
                writeln!(out, "Task updated successfully!")?;
            }
        }
        "delete" => {
            let id = task_id(matches);
            if board.delete_task(&id) {
                writeln!(out, "Deleted {id}")?;
            } else {
                writeln!(out, "No task with id {id}")?;
            }
        }
        "stats" => write_stats(board, due_soon_days, out)?,
        "clear" => {
            if matches.get_flag("yes") {
                board.clear();
                writeln!(out, "All tasks deleted")?;
            } else {
                writeln!(out, "Refusing to clear without --yes")?;
            }
        }
        other => return Err(AppError::Config(format!("unknown subcommand '{other}'"))),
    }

    if let Some(warning) = board.storage_warning() {
        writeln!(out, "warning: {warning}")?;
    }
    Ok(())
}

fn string_arg(matches: &ArgMatches, name: &str) -> Option<String> {
    matches.get_one::<String>(name).cloned()
}

fn task_id(matches: &ArgMatches) -> TaskId {
    TaskId::from(string_arg(matches, "id").unwrap_or_default())
}

fn write_columns<S: KeyValueStore, C: Clock>(
    board: &KanbanBoard<S, C>,
    only: Option<Status>,
    due_soon_days: i64,
    out: &mut impl Write,
) -> Result<(), AppError> {
    let now = board.clock().local_now();
    for column in build_columns(board.tasks(), &now, due_soon_days) {
        if only.is_some_and(|s| s != column.status) {
            continue;
        }
        writeln!(out, "{} ({}):", column.title, column.count_label)?;
        for card in &column.cards {
            let mut line = format!(
                "  #{} [{}] {} ({})",
                card.number, card.task.id, card.task.title, card.priority.label
            );
            if let Some(due) = &card.due_label {
                line.push_str(&format!(" due {due}"));
            }
            if card.overdue {
                line.push_str(" OVERDUE");
            } else if card.due_soon {
                line.push_str(" DUE SOON");
            }
            line.push_str(&format!(" - {}", card.elapsed));
            writeln!(out, "{line}")?;
        }
    }
    Ok(())
}

fn write_stats<S: KeyValueStore, C: Clock>(
    board: &KanbanBoard<S, C>,
    due_soon_days: i64,
    out: &mut impl Write,
) -> Result<(), AppError> {
    let now = board.clock().local_now();
    for status in Status::ALL {
        writeln!(out, "{}: {}", status.title(), board.find_by_status(status).len())?;
    }
    let overdue = board
        .tasks()
        .iter()
        .filter(|t| presentation::is_overdue(t, &now))
        .count();
    let due_soon = board
        .tasks()
        .iter()
        .filter(|t| presentation::is_due_soon(t, &now, due_soon_days))
        .count();
    writeln!(out, "Overdue: {overdue}")?;
    writeln!(out, "Due soon: {due_soon}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::storage::{MemoryStore, TaskStorage};
    use chrono::{TimeZone, Utc};

    fn board() -> KanbanBoard<MemoryStore, FixedClock> {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap());
        KanbanBoard::load(TaskStorage::new(MemoryStore::new(), DEFAULT_STORAGE_KEY), clock)
    }

    fn run(
        board: &mut KanbanBoard<MemoryStore, FixedClock>,
        args: &[&str],
    ) -> Result<String, AppError> {
        let matches = command()
            .try_get_matches_from(std::iter::once("taskboard").chain(args.iter().copied()))
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        let mut out = Vec::new();
        run_subcommand(board, name, sub, 2, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn command_definition_is_consistent() {
        command().debug_assert();
    }

    #[test]
    fn add_then_list_shows_the_card() {
        let mut board = board();
        run(&mut board, &["add", "Buy milk", "-p", "low"]).unwrap();
        let listed = run(&mut board, &["list", "--status", "todo"]).unwrap();
        assert!(listed.starts_with("To Do (1 task):"));
        assert!(listed.contains("#001"));
        assert!(listed.contains("Buy milk (Low)"));
        assert!(!listed.contains("Completed"));
    }

    #[test]
    fn invalid_add_reports_every_field() {
        let mut board = board();
        let err = run(&mut board, &["add", "ab", "--due", "2001-01-01"]).unwrap_err();
        match err {
            AppError::Validation(errors) => {
                assert!(errors.title.is_some());
                assert!(errors.due_date.is_some());
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(board.tasks().is_empty());
    }

    #[test]
    fn move_and_delete_by_id() {
        let mut board = board();
        run(&mut board, &["add", "Write report", "--due", "2030-01-01"]).unwrap();
        let id = board.tasks()[0].id.to_string();

        let moved = run(&mut board, &["move", &id, "done"]).unwrap();
        assert!(moved.contains("Completed"));
        assert_eq!(board.tasks()[0].status, Status::Completed);

        run(&mut board, &["delete", &id]).unwrap();
        assert!(board.tasks().is_empty());
        let again = run(&mut board, &["delete", &id]).unwrap();
        assert!(again.contains("No task with id"));
    }

    #[test]
    fn edit_keeps_fields_not_given() {
        let mut board = board();
        run(
            &mut board,
            &["add", "Draft", "-d", "notes", "-p", "high", "--due", "2030-05-01"],
        )
        .unwrap();
        let id = board.tasks()[0].id.to_string();

        let out = run(&mut board, &["edit", &id, "--title", "Final draft"]).unwrap();
        assert!(out.contains("Task updated successfully!"));
        let task = &board.tasks()[0];
        assert_eq!(task.title, "Final draft");
        assert_eq!(task.description, "notes");
        assert_eq!(task.priority, Priority::High);
        assert!(task.due_date.is_some());

        run(&mut board, &["edit", &id, "--due", ""]).unwrap();
        assert_eq!(board.tasks()[0].due_date, None);
    }

    #[test]
    fn stats_counts_columns() {
        let mut board = board();
        run(&mut board, &["add", "one one"]).unwrap();
        run(&mut board, &["add", "two two"]).unwrap();
        let id = board.tasks()[1].id.to_string();
        run(&mut board, &["move", &id, "in-progress"]).unwrap();

        let stats = run(&mut board, &["stats"]).unwrap();
        assert!(stats.contains("To Do: 1"));
        assert!(stats.contains("In Progress: 1"));
        assert!(stats.contains("Completed: 0"));
        assert!(stats.contains("Overdue: 0"));
    }

    #[test]
    fn clear_requires_confirmation() {
        let mut board = board();
        run(&mut board, &["add", "keep me"]).unwrap();
        run(&mut board, &["clear"]).unwrap();
        assert_eq!(board.tasks().len(), 1);
        run(&mut board, &["clear", "--yes"]).unwrap();
        assert!(board.tasks().is_empty());
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failures_are_output_errors() {
        let mut board = board();
        run(&mut board, &["add", "Buy milk"]).unwrap();
        for args in [["taskboard", "list"], ["taskboard", "stats"]] {
            let matches = command().try_get_matches_from(args).unwrap();
            let (name, sub) = matches.subcommand().unwrap();
            let err = run_subcommand(&mut board, name, sub, 2, &mut ClosedPipe).unwrap_err();
            assert!(matches!(err, AppError::Output(_)), "{err:?}");
        }
    }
}

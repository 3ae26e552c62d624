use chrono::{Duration, NaiveDate, TimeZone, Utc};
use tempfile::tempdir;

use taskboard::clock::{Clock, FixedClock};
use taskboard::kanban_board::KanbanBoard;
use taskboard::presentation::{build_columns, DEFAULT_DUE_SOON_DAYS};
use taskboard::storage::{FileStore, TaskStorage, DEFAULT_STORAGE_KEY};
use taskboard::task::{Priority, Status};
use taskboard::validation::FormPayload;

fn clock() -> FixedClock {
    FixedClock::new(Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap())
}

fn open(dir: &std::path::Path) -> KanbanBoard<FileStore, FixedClock> {
    KanbanBoard::load(TaskStorage::new(FileStore::new(dir), DEFAULT_STORAGE_KEY), clock())
}

#[test]
fn buy_milk_lands_in_todo_and_can_be_reopened() {
    let dir = tempdir().unwrap();
    let mut board = open(dir.path());

    let payload = FormPayload {
        title: "Buy milk".into(),
        description: String::new(),
        due_date: String::new(),
        priority: Priority::Low,
    };
    let today = board.clock().local_now().date_naive();
    let id = board.add_task(payload.into_draft(today).unwrap());

    let now = board.clock().now();
    let columns = build_columns(board.tasks(), &now, DEFAULT_DUE_SOON_DAYS);
    let card = &columns[0].cards[0];
    assert_eq!(columns[0].status, Status::ToDo);
    assert_eq!(card.task.id, id);
    assert_eq!(card.number, "001");
    assert_eq!(card.elapsed, "just now");

    assert!(board.update_status(&id, Status::Completed));
    assert!(board.update_status(&id, Status::ToDo));
    assert_eq!(board.find_by_id(&id).unwrap().status, Status::ToDo);
}

#[test]
fn board_survives_a_restart() {
    let dir = tempdir().unwrap();
    let mut board = open(dir.path());
    let due = NaiveDate::from_ymd_opt(2025, 6, 17);
    let a = board.add_task(taskboard::task::TaskDraft {
        title: "Ship release".into(),
        description: " notes ".into(),
        priority: Priority::High,
        due_date: due,
    });
    board.update_status(&a, Status::InProgress);
    let before = board.tasks().to_vec();
    drop(board);

    let reopened = open(dir.path());
    assert_eq!(reopened.tasks(), before.as_slice());

    let later = clock().now() + Duration::hours(1);
    let columns = build_columns(reopened.tasks(), &later, DEFAULT_DUE_SOON_DAYS);
    let card = &columns[1].cards[0];
    assert!(card.due_soon);
    assert!(!card.overdue);
    assert_eq!(card.elapsed, "1h ago");
}

#[test]
fn corrupt_storage_starts_empty_and_is_overwritten() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("kanban-tasks.json"), "not json at all").unwrap();

    let mut board = open(dir.path());
    assert!(board.tasks().is_empty());
    assert!(board.storage_warning().is_some());

    board.add_task(taskboard::task::TaskDraft {
        title: "Fresh start".into(),
        ..Default::default()
    });
    assert!(board.storage_warning().is_none());
    assert_eq!(open(dir.path()).tasks().len(), 1);
}

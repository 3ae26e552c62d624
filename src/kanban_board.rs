use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::storage::{KeyValueStore, TaskStorage};
use crate::task::{Status, Task, TaskDraft, TaskId};

/// The authoritative task list. Insertion order is preserved and is what the
/// board shows as each card's sequence number. Every mutation is written
/// through to storage before returning.
#[derive(Debug)]
pub struct KanbanBoard<S, C = SystemClock> {
    tasks: Vec<Task>,
    storage: TaskStorage<S>,
    clock: C,
}

impl<S: KeyValueStore, C: Clock> KanbanBoard<S, C> {
    /// Starts from whatever storage holds; unreadable data means an empty board.
    pub fn load(mut storage: TaskStorage<S>, clock: C) -> Self {
        let tasks = storage.load().unwrap_or_default();
        info!(key = storage.key(), count = tasks.len(), "board loaded");
        Self {
            tasks,
            storage,
            clock,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Set while the last write, read or clear of storage failed.
    pub fn storage_warning(&self) -> Option<&str> {
        self.storage.last_error()
    }

    fn fresh_id(&self) -> TaskId {
        loop {
            let id = TaskId::generate(self.clock.now());
            if self.find_by_id(&id).is_none() {
                return id;
            }
        }
    }

    pub fn add_task(&mut self, draft: TaskDraft) -> TaskId {
        let id = self.fresh_id();
        let task = Task {
            id: id.clone(),
            title: draft.title.trim().to_string(),
            description: draft.description.trim().to_string(),
            status: Status::ToDo,
            priority: draft.priority,
            due_date: draft.due_date,
            created_at: self.clock.now(),
        };
        self.tasks.push(task);
        info!(%id, "task added");
        self.storage.save(&self.tasks);
        id
    }

    /// Returns `false` (and changes nothing) when `id` is unknown.
    pub fn update_status(&mut self, id: &TaskId, status: Status) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|t| &t.id == id) else {
            debug!(%id, "status change for unknown task ignored");
            return false;
        };
        task.status = status;
        info!(%id, %status, "task moved");
        self.storage.save(&self.tasks);
        true
    }

    /// Overwrites the editable fields only; id, status and creation time stay.
    pub fn update_task(&mut self, id: &TaskId, draft: TaskDraft) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|t| &t.id == id) else {
            debug!(%id, "edit of unknown task ignored");
            return false;
        };
        task.title = draft.title.trim().to_string();
        task.description = draft.description.trim().to_string();
        task.priority = draft.priority;
        task.due_date = draft.due_date;
        info!(%id, "task updated");
        self.storage.save(&self.tasks);
        true
    }

    pub fn delete_task(&mut self, id: &TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| &t.id != id);
        if self.tasks.len() == before {
            debug!(%id, "delete of unknown task ignored");
            return false;
        }
        info!(%id, "task deleted");
        self.storage.save(&self.tasks);
        true
    }

    /// Drops every task and the stored value.
    pub fn clear(&mut self) {
        self.tasks.clear();
        self.storage.clear();
        info!("board cleared");
    }

    pub fn find_by_id(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    pub fn find_by_status(&self, status: Status) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.status == status).collect()
    }
}

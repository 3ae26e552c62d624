use std::path::PathBuf;

use clap::ArgMatches;

use crate::clock::SystemClock;
use crate::error::AppError;
use crate::kanban_board::KanbanBoard;
use crate::logging::DEFAULT_LOG_LEVEL;
use crate::presentation::DEFAULT_DUE_SOON_DAYS;
use crate::storage::{FileStore, TaskStorage, DEFAULT_QUOTA_BYTES};

pub const DEFAULT_DATA_DIR: &str = ".taskboard";
pub const LOG_FILE: &str = "taskboard.log";

/// Runtime settings, taken from global flags or their environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub storage_key: String,
    pub due_soon_days: i64,
    pub quota_bytes: usize,
    pub log_level: String,
}

impl Config {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self, AppError> {
        let data_dir = matches
            .get_one::<PathBuf>("data-dir")
            .cloned()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        if data_dir.is_file() {
            return Err(AppError::Config(format!(
                "data dir {} is a file",
                data_dir.display()
            )));
        }

        let storage_key = matches
            .get_one::<String>("storage-key")
            .cloned()
            .unwrap_or_default();
        if storage_key.is_empty()
            || !storage_key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(AppError::Config(format!(
                "storage key '{storage_key}' must be non-empty \
                 and use only letters, digits, '-' or '_'"
            )));
        }

        Ok(Self {
            data_dir,
            storage_key,
            due_soon_days: matches
                .get_one::<i64>("due-soon-days")
                .copied()
                .unwrap_or(DEFAULT_DUE_SOON_DAYS),
            quota_bytes: matches
                .get_one::<usize>("quota-bytes")
                .copied()
                .unwrap_or(DEFAULT_QUOTA_BYTES),
            log_level: matches
                .get_one::<String>("log-level")
                .cloned()
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(LOG_FILE)
    }

    pub fn open_board(&self) -> KanbanBoard<FileStore, SystemClock> {
        let store = FileStore::new(&self.data_dir).with_quota(self.quota_bytes);
        KanbanBoard::load(TaskStorage::new(store, &self.storage_key), SystemClock)
    }
}

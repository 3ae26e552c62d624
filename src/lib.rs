//! A three-column Kanban board (To Do, In Progress, Completed) for the terminal.
//!
//! Tasks live in a [`kanban_board::KanbanBoard`], which writes every change
//! through to a string-keyed [`storage::KeyValueStore`]. Form input passes
//! [`validation`] before it reaches the board, and [`presentation`] derives what
//! each card shows (overdue, due soon, elapsed time) fresh on every draw.

pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod kanban_board;
pub mod logging;
pub mod notification;
pub mod presentation;
pub mod storage;
pub mod task;
pub mod ui;
pub mod validation;

use std::io::{self, Stdout};
use std::process::ExitCode;

use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, info, warn};

use taskboard::cli::{command, run_subcommand};
use taskboard::config::Config;
use taskboard::error::AppError;
use taskboard::logging;
use taskboard::ui::{run_app, App};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(AppError::Validation(errors)) => {
            for (field, message) in errors.messages() {
                eprintln!("{field}: {message}");
            }
            ExitCode::FAILURE
        }
        Err(err) => {
            error!(error = %err, "exiting");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), AppError> {
    let matches = command().get_matches();
    let config = Config::from_matches(&matches)?;
    logging::init(&config.log_path(), &config.log_level)?;
    info!(data_dir = %config.data_dir.display(), "starting");

    let mut board = config.open_board();

    if let Some((name, sub)) = matches.subcommand() {
        let mut stdout = io::stdout();
        return run_subcommand(&mut board, name, sub, config.due_soon_days, &mut stdout);
    }

    let mut terminal = setup_terminal().map_err(AppError::Terminal)?;
    let mut app = App::new(board, config.due_soon_days);
    let result = run_app(&mut terminal, &mut app);
    restore_terminal().map_err(AppError::Terminal)?;
    terminal.show_cursor().map_err(AppError::Terminal)?;

    info!("board closed");
    result.map_err(AppError::Terminal)
}

/// Raw mode plus alternate screen; undone again if any later step fails.
fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    let terminal = execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .and_then(|()| Terminal::new(CrosstermBackend::new(stdout)));
    undo_on_error(terminal, restore_terminal)
}

/// Runs `undo` when `result` failed; an `undo` failure is only logged.
fn undo_on_error<T>(
    result: io::Result<T>,
    undo: impl FnOnce() -> io::Result<()>,
) -> io::Result<T> {
    if result.is_err() {
        if let Err(err) = undo() {
            warn!(error = %err, "failed to restore terminal");
        }
    }
    result
}

fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn failed_setup_is_undone() {
        let undone = Cell::new(false);
        let result: io::Result<()> = undo_on_error(Err(io::ErrorKind::Other.into()), || {
            undone.set(true);
            Ok(())
        });
        assert!(result.is_err());
        assert!(undone.get());
    }

    #[test]
    fn successful_setup_is_kept() {
        let undone = Cell::new(false);
        let result = undo_on_error(Ok(7), || {
            undone.set(true);
            Ok(())
        });
        assert_eq!(result.unwrap(), 7);
        assert!(!undone.get());
    }

    #[test]
    fn undo_failure_keeps_the_original_error() {
        let result: io::Result<()> = undo_on_error(Err(io::ErrorKind::NotFound.into()), || {
            Err(io::ErrorKind::Other.into())
        });
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }
}

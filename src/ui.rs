use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use tracing::debug;

use crate::clock::Clock;
use crate::kanban_board::KanbanBoard;
use crate::notification::{NotificationKind, Notifier, Phase};
use crate::presentation::{build_columns, status_color, CardView, ColumnView};
use crate::storage::KeyValueStore;
use crate::task::{Status, TaskId};
use crate::validation::{FormErrors, FormPayload, DESCRIPTION_MAX_CHARS};

const TICK: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Description,
    DueDate,
    Priority,
}

impl FormField {
    fn next(self) -> Self {
        match self {
            FormField::Title => FormField::Description,
            FormField::Description => FormField::DueDate,
            FormField::DueDate => FormField::Priority,
            FormField::Priority => FormField::Title,
        }
    }

    fn prev(self) -> Self {
        match self {
            FormField::Title => FormField::Priority,
            FormField::Description => FormField::Title,
            FormField::DueDate => FormField::Description,
            FormField::Priority => FormField::DueDate,
        }
    }
}

/// The add/edit modal. `editing` is `None` when creating.
#[derive(Debug, Clone)]
pub struct TaskForm {
    pub editing: Option<TaskId>,
    pub focus: FormField,
    pub payload: FormPayload,
    pub errors: FormErrors,
}

impl TaskForm {
    fn new(editing: Option<TaskId>, payload: FormPayload) -> Self {
        Self {
            editing,
            focus: FormField::Title,
            payload,
            errors: FormErrors::default(),
        }
    }

    fn focused_text(&mut self) -> Option<&mut String> {
        match self.focus {
            FormField::Title => Some(&mut self.payload.title),
            FormField::Description => Some(&mut self.payload.description),
            FormField::DueDate => Some(&mut self.payload.due_date),
            FormField::Priority => None,
        }
    }

    fn clear_focused_error(&mut self) {
        match self.focus {
            FormField::Title => self.errors.title = None,
            FormField::Description => self.errors.description = None,
            FormField::DueDate => self.errors.due_date = None,
            FormField::Priority => {}
        }
    }
}

pub struct App<S, C> {
    board: KanbanBoard<S, C>,
    due_soon_days: i64,
    selected_status: usize,
    selected_task: usize,
    form: Option<TaskForm>,
    notifier: Notifier,
}

impl<S: KeyValueStore, C: Clock> App<S, C> {
    pub fn new(board: KanbanBoard<S, C>, due_soon_days: i64) -> Self {
        Self {
            board,
            due_soon_days,
            selected_status: 0,
            selected_task: 0,
            form: None,
            notifier: Notifier::default(),
        }
    }

    pub fn board(&self) -> &KanbanBoard<S, C> {
        &self.board
    }

    pub fn form(&self) -> Option<&TaskForm> {
        self.form.as_ref()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn selected_status(&self) -> Status {
        Status::ALL[self.selected_status]
    }

    pub fn selected_task_id(&self) -> Option<TaskId> {
        self.board
            .find_by_status(self.selected_status())
            .get(self.selected_task)
            .map(|t| t.id.clone())
    }

    fn column_len(&self) -> usize {
        self.board.find_by_status(self.selected_status()).len()
    }

    fn clamp_selection(&mut self) {
        self.selected_task = self.selected_task.min(self.column_len().saturating_sub(1));
    }

    pub fn tick(&mut self, now: Instant) {
        self.notifier.tick(now);
    }

    /// Applies one key press. Returns `true` when the user asked to quit.
    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> bool {
        if self.form.is_some() {
            self.handle_form_key(key, now);
            return false;
        }

        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Left | KeyCode::Char('h') => {
                self.selected_status = self.selected_status.saturating_sub(1);
                self.clamp_selection();
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.selected_status = (self.selected_status + 1).min(Status::ALL.len() - 1);
                self.clamp_selection();
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_task = self.selected_task.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected_task + 1 < self.column_len() {
                    self.selected_task += 1;
                }
            }
            KeyCode::Char('a') => {
                self.form = Some(TaskForm::new(None, FormPayload::default()));
            }
            KeyCode::Char('e') | KeyCode::Enter => self.open_edit_form(),
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(id) = self.selected_task_id() {
                    self.board.delete_task(&id);
                    self.clamp_selection();
                }
            }
            KeyCode::Char(c @ '1'..='3') => {
                let target = Status::ALL[c as usize - '1' as usize];
                if let Some(id) = self.selected_task_id() {
                    self.board.update_status(&id, target);
                    self.clamp_selection();
                }
            }
            _ => {}
        }
        false
    }

    fn open_edit_form(&mut self) {
        let Some(task) = self
            .selected_task_id()
            .and_then(|id| self.board.find_by_id(&id))
        else {
            return;
        };
        let payload = FormPayload {
            title: task.title.clone(),
            description: task.description.clone(),
            due_date: task
                .due_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            priority: task.priority,
        };
        self.form = Some(TaskForm::new(Some(task.id.clone()), payload));
    }

    fn handle_form_key(&mut self, key: KeyEvent, now: Instant) {
        match key.code {
            KeyCode::Esc => {
                self.form = None;
                return;
            }
            KeyCode::Enter => {
                self.submit_form(now);
                return;
            }
            _ => {}
        }

        let Some(form) = self.form.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Tab => form.focus = form.focus.next(),
            KeyCode::BackTab => form.focus = form.focus.prev(),
            KeyCode::Left if form.focus == FormField::Priority => {
                form.payload.priority = form.payload.priority.prev();
            }
            KeyCode::Right if form.focus == FormField::Priority => {
                form.payload.priority = form.payload.priority.next();
            }
            KeyCode::Backspace => {
                if let Some(text) = form.focused_text() {
                    text.pop();
                }
                form.clear_focused_error();
            }
            KeyCode::Char(c) => {
                if let Some(text) = form.focused_text() {
                    text.push(c);
                }
                form.clear_focused_error();
            }
            _ => {}
        }
    }

    fn submit_form(&mut self, now: Instant) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        let today = self.board.clock().local_now().date_naive();
        let draft = match form.payload.clone().into_draft(today) {
            Ok(draft) => draft,
            Err(errors) => {
                debug!(%errors, "form rejected");
                form.errors = errors;
                return;
            }
        };

        let editing = form.editing.clone();
        self.form = None;
        match editing {
            None => {
                self.board.add_task(draft);
                self.notifier
                    .show("Task added successfully!", NotificationKind::Success, now);
            }
            Some(id) => {
                if self.board.update_task(&id, draft) {
                    self.notifier
                        .show("Task updated successfully!", NotificationKind::Success, now);
                } else {
                    self.notifier
                        .show("Task no longer exists", NotificationKind::Error, now);
                }
            }
        }
    }

    pub fn draw(&self, f: &mut Frame) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(5), Constraint::Length(1)])
            .split(f.area());

        let columns_area = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![
                Constraint::Percentage(33),
                Constraint::Percentage(33),
                Constraint::Percentage(34),
            ])
            .split(rows[0]);

        let now = self.board.clock().local_now();
        let columns = build_columns(self.board.tasks(), &now, self.due_soon_days);
        for (i, column) in columns.iter().enumerate() {
            self.draw_column(f, column, i == self.selected_status, columns_area[i]);
        }

        self.draw_status_bar(f, rows[1]);

        if let Some(form) = &self.form {
            draw_form(f, form);
        }
        self.draw_notification(f, Instant::now());
    }

    fn draw_column(&self, f: &mut Frame, column: &ColumnView<'_>, selected: bool, area: Rect) {
        let block = Block::default()
            .title(Line::from(vec![
                Span::styled(
                    format!(" {} ", column.title),
                    Style::default()
                        .fg(status_color(column.status))
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("{} ", column.count_label),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
            .borders(Borders::ALL)
            .border_style(if selected {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            });

        if column.cards.is_empty() {
            let empty = Paragraph::new(vec![
                Line::from(""),
                Line::from("No tasks yet"),
                Line::from("Press a to add one"),
            ])
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
            f.render_widget(empty, area);
            return;
        }

        let items: Vec<ListItem> = column.cards.iter().map(card_item).collect();
        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().add_modifier(Modifier::BOLD))
            .highlight_symbol("▌");

        let mut state = ListState::default();
        if selected {
            state.select(Some(self.selected_task));
        }
        f.render_stateful_widget(list, area, &mut state);
    }

    fn draw_status_bar(&self, f: &mut Frame, area: Rect) {
        let line = match self.board.storage_warning() {
            Some(warning) => Line::from(Span::styled(
                format!(" ⚠ {warning}"),
                Style::default().fg(Color::Red),
            )),
            None => Line::from(Span::styled(
                " a add  e edit  d delete  1/2/3 move  ←→ column  ↑↓ task  q quit",
                Style::default().fg(Color::DarkGray),
            )),
        };
        f.render_widget(Paragraph::new(line), area);
    }

    fn draw_notification(&self, f: &mut Frame, now: Instant) {
        let Some(notification) = self.notifier.current() else {
            return;
        };
        let color = match notification.kind {
            NotificationKind::Success => Color::Green,
            NotificationKind::Error => Color::Red,
        };
        let style = match notification.phase(now) {
            Phase::Visible => Style::default().fg(Color::Black).bg(color),
            Phase::Fading => Style::default().fg(color),
            Phase::Gone => return,
        };

        let area = f.area();
        let width = (notification.message.chars().count() as u16 + 4).min(area.width);
        let rect = Rect::new(
            area.width.saturating_sub(width + 1),
            area.height.saturating_sub(4),
            width,
            3,
        )
        .intersection(area);
        f.render_widget(Clear, rect);
        f.render_widget(
            Paragraph::new(notification.message.as_str())
                .style(style)
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).border_style(style)),
            rect,
        );
    }
}

fn card_item<'a>(card: &CardView<'a>) -> ListItem<'a> {
    let task = card.task;
    let mut lines = Vec::new();

    lines.push(Line::from(vec![
        Span::styled("● ", Style::default().fg(status_color(task.status))),
        Span::styled(format!("#{}", card.number), Style::default().fg(Color::DarkGray)),
    ]));

    let title_style = if card.done {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
    };
    lines.push(Line::from(Span::styled(task.title.as_str(), title_style)));

    if !task.description.is_empty() {
        lines.push(Line::from(Span::styled(
            task.description.as_str(),
            Style::default().fg(Color::Gray),
        )));
    }

    let mut badges = vec![Span::styled(
        card.priority.label,
        Style::default().fg(card.priority.color),
    )];
    if card.overdue {
        badges.push(Span::styled(
            " OVERDUE",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }
    if card.due_soon {
        badges.push(Span::styled(" DUE SOON", Style::default().fg(Color::LightRed)));
    }
    if card.done {
        badges.push(Span::styled(" ✓ DONE", Style::default().fg(Color::Green)));
    }
    lines.push(Line::from(badges));

    let mut meta = Vec::new();
    if let Some(due) = &card.due_label {
        let due_style = if card.overdue {
            Style::default().fg(Color::Red)
        } else if card.due_soon {
            Style::default().fg(Color::LightRed)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        meta.push(Span::styled(format!("due {due}  "), due_style));
    }
    meta.push(Span::styled(card.elapsed.clone(), Style::default().fg(Color::DarkGray)));
    lines.push(Line::from(meta));
    lines.push(Line::from(""));

    ListItem::new(Text::from(lines))
}

fn draw_form(f: &mut Frame, form: &TaskForm) {
    let area = centered_rect(60, 70, f.area());
    f.render_widget(Clear, area);

    let (title, submit) = match form.editing {
        Some(_) => (" Edit Task ", "Save Changes"),
        None => (" Create New Task ", "Add Task"),
    };

    let label = |field: FormField, name: &str| {
        let style = if form.focus == field {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        Line::from(Span::styled(name.to_string(), style))
    };
    let value = |field: FormField, text: &str| {
        let cursor = if form.focus == field { "_" } else { "" };
        Line::from(format!("  {text}{cursor}"))
    };
    let error = |msg: &Option<String>| {
        msg.as_ref()
            .map(|m| Line::from(Span::styled(format!("  {m}"), Style::default().fg(Color::Red))))
    };

    let description_len = form.payload.description.chars().count();
    let counter_style = if description_len > DESCRIPTION_MAX_CHARS {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let mut lines = vec![
        label(FormField::Title, "Title"),
        value(FormField::Title, &form.payload.title),
    ];
    lines.extend(error(&form.errors.title));
    lines.push(Line::from(""));

    lines.push(Line::from(vec![
        label(FormField::Description, "Description ").spans[0].clone(),
        Span::styled(format!("{description_len}/{DESCRIPTION_MAX_CHARS}"), counter_style),
    ]));
    lines.push(value(FormField::Description, &form.payload.description));
    lines.extend(error(&form.errors.description));
    lines.push(Line::from(""));

    lines.push(label(FormField::DueDate, "Due date (YYYY-MM-DD)"));
    lines.push(value(FormField::DueDate, &form.payload.due_date));
    lines.extend(error(&form.errors.due_date));
    lines.push(Line::from(""));

    lines.push(label(FormField::Priority, "Priority"));
    lines.push(Line::from(format!("  < {} >", form.payload.priority)));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("Enter: {submit}   Tab: next field   Esc: cancel"),
        Style::default().fg(Color::DarkGray),
    )));

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

pub fn run_app<B: Backend, S: KeyValueStore, C: Clock>(
    terminal: &mut Terminal<B>,
    app: &mut App<S, C>,
) -> io::Result<()> {
    loop {
        app.tick(Instant::now());
        terminal.draw(|f| app.draw(f))?;

        if !event::poll(TICK)? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press && app.handle_key(key, Instant::now()) {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::storage::{MemoryStore, TaskStorage, DEFAULT_STORAGE_KEY};
    use crate::task::Priority;
    use chrono::{TimeZone, Utc};
    use ratatui::backend::TestBackend;

    fn app() -> App<MemoryStore, FixedClock> {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap());
        let storage = TaskStorage::new(MemoryStore::new(), DEFAULT_STORAGE_KEY);
        let board = KanbanBoard::load(storage, clock);
        App::new(board, 2)
    }

    fn press(app: &mut App<MemoryStore, FixedClock>, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE), Instant::now())
    }

    fn type_text(app: &mut App<MemoryStore, FixedClock>, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn add(app: &mut App<MemoryStore, FixedClock>, title: &str) {
        press(app, KeyCode::Char('a'));
        type_text(app, title);
        press(app, KeyCode::Enter);
    }

    fn screen(app: &App<MemoryStore, FixedClock>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| app.draw(f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn adding_through_the_form_notifies_success() {
        let mut app = app();
        add(&mut app, "Buy milk");

        assert!(app.form().is_none());
        assert_eq!(app.board().tasks().len(), 1);
        assert_eq!(app.board().tasks()[0].title, "Buy milk");
        assert_eq!(
            app.notifier().current().unwrap().message,
            "Task added successfully!"
        );
    }

    #[test]
    fn invalid_form_stays_open_with_errors() {
        let mut app = app();
        add(&mut app, "ab");

        let form = app.form().unwrap();
        assert!(form.errors.title.is_some());
        assert!(app.board().tasks().is_empty());
        assert!(app.notifier().current().is_none());

        press(&mut app, KeyCode::Char('c'));
        assert!(app.form().unwrap().errors.title.is_none());
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.board().tasks().len(), 1);
    }

    #[test]
    fn escape_discards_the_form() {
        let mut app = app();
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "never saved");
        press(&mut app, KeyCode::Esc);
        assert!(app.form().is_none());
        assert!(app.board().tasks().is_empty());
    }

    #[test]
    fn form_fields_and_priority_cycle() {
        let mut app = app();
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "Plan trip");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "flights");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "2031-02-03");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Enter);

        let task = &app.board().tasks()[0];
        assert_eq!(task.description, "flights");
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.due_date.unwrap().to_string(), "2031-02-03");
    }

    #[test]
    fn edit_prefills_and_updates() {
        let mut app = app();
        add(&mut app, "Draft");
        press(&mut app, KeyCode::Char('e'));
        assert_eq!(app.form().unwrap().payload.title, "Draft");

        type_text(&mut app, " v2");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.board().tasks()[0].title, "Draft v2");
        assert_eq!(
            app.notifier().current().unwrap().message,
            "Task updated successfully!"
        );
    }

    #[test]
    fn number_keys_move_and_d_deletes_without_confirmation() {
        let mut app = app();
        add(&mut app, "Buy milk");
        let id = app.selected_task_id().unwrap();
        app.tick(Instant::now() + Duration::from_secs(4));
        assert!(app.notifier().current().is_none());

        press(&mut app, KeyCode::Char('3'));
        assert_eq!(app.board().find_by_id(&id).unwrap().status, Status::Completed);
        assert!(app.selected_task_id().is_none());
        assert!(app.notifier().current().is_none());

        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Right);
        assert_eq!(app.selected_task_id(), Some(id.clone()));
        press(&mut app, KeyCode::Char('1'));
        assert_eq!(app.board().find_by_id(&id).unwrap().status, Status::ToDo);
        assert!(app.notifier().current().is_none());

        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Char('d'));
        assert!(app.board().tasks().is_empty());
        assert!(app.notifier().current().is_none());
    }

    #[test]
    fn selection_stays_in_bounds() {
        let mut app = app();
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Up);
        add(&mut app, "first");
        add(&mut app, "second");
        for _ in 0..5 {
            press(&mut app, KeyCode::Down);
        }
        assert_eq!(app.selected_task_id(), Some(app.board().tasks()[1].id.clone()));
        press(&mut app, KeyCode::Char('d'));
        assert_eq!(app.selected_task_id(), Some(app.board().tasks()[0].id.clone()));
    }

    #[test]
    fn q_quits_only_outside_the_form() {
        let mut app = app();
        press(&mut app, KeyCode::Char('a'));
        assert!(!press(&mut app, KeyCode::Char('q')));
        press(&mut app, KeyCode::Esc);
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn board_renders_columns_and_cards() {
        let mut app = app();
        add(&mut app, "Buy milk");
        let rendered = screen(&app);
        assert!(rendered.contains("To Do"));
        assert!(rendered.contains("In Progress"));
        assert!(rendered.contains("1 task"));
        assert!(rendered.contains("#001"));
        assert!(rendered.contains("Buy milk"));
        assert!(rendered.contains("No tasks yet"));
    }

    #[test]
    fn form_renders_counter_and_errors() {
        let mut app = app();
        add(&mut app, "ab");
        let rendered = screen(&app);
        assert!(rendered.contains("Create New Task"));
        assert!(rendered.contains("0/500"));
        assert!(rendered.contains("too short"));
    }
}

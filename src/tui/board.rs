//! Interactive Kanban board.
//!
//! Five columns, one per status, with WIP counts in the column titles. Cards are
//! moved with Ctrl+Left/Right through the engine, so WIP limits, time in status
//! and the activity log behave exactly as on the command line. A move blocked by
//! a WIP limit can be forced with `f`.

use std::io;
use std::time::Duration;

use chrono::Utc;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};

use crate::cmd::Session;
use crate::db::{format_due_relative, format_duration_ms, format_priority, format_status, format_tag, truncate};
use crate::energy::compute_team_energy;
use crate::engine::MoveOutcome;
use crate::error::Error;
use crate::fields::{Priority, Status, WipState};
use crate::filter::FilterState;
use crate::task::Task;
use crate::tui::colors::{parse_hex, status_color, AMBER, RED};
use crate::tui::input::InputField;

const COLUMN_COUNT: usize = Status::ALL.len();

/// What keystrokes currently go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    Filter,
    Comment,
    /// A move was refused by a WIP limit; `f` forces it.
    ConfirmForce { task_id: u64, to: Status },
}

pub struct BoardApp<'a> {
    session: &'a mut Session,
    mode: Mode,
    selected_column: usize,
    selected_card: usize,
    column_scroll_offsets: [usize; COLUMN_COUNT],
    status_message: String,
    show_task_detail: bool,
    filter: FilterState,
    input: InputField,
    /// Visible task ids per column, in board order, after filtering.
    columns: [Vec<u64>; COLUMN_COUNT],
}

impl<'a> BoardApp<'a> {
    pub fn new(session: &'a mut Session) -> Self {
        let mut app = BoardApp {
            session,
            mode: Mode::Normal,
            selected_column: 0,
            selected_card: 0,
            column_scroll_offsets: [0; COLUMN_COUNT],
            status_message: String::new(),
            show_task_detail: false,
            filter: FilterState::default(),
            input: InputField::new(),
            columns: Default::default(),
        };
        app.update_columns();
        app
    }

    /// Rebuild the visible columns from the store's column order and the filter.
    fn update_columns(&mut self) {
        let db = &self.session.db;
        for (i, status) in Status::ALL.iter().enumerate() {
            self.columns[i] = db
                .column_ids(*status)
                .iter()
                .copied()
                .filter(|id| db.get(*id).map(|t| self.filter.matches(t)).unwrap_or(false))
                .collect();
        }
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        if self.selected_column >= COLUMN_COUNT {
            self.selected_column = 0;
        }
        let len = self.columns[self.selected_column].len();
        if len == 0 {
            self.selected_card = 0;
            self.column_scroll_offsets[self.selected_column] = 0;
        } else if self.selected_card >= len {
            self.selected_card = len - 1;
        }
    }

    fn selected_task_id(&self) -> Option<u64> {
        self.columns[self.selected_column].get(self.selected_card).copied()
    }

    fn save(&mut self) -> bool {
        match self.session.db.save(&self.session.db_path) {
            Ok(()) => true,
            Err(e) => {
                self.status_message = format!("Error saving: {}", e);
                false
            }
        }
    }

    /// Move the selected card one column left or right.
    fn move_selected(&mut self, forward: bool) {
        let Some(task_id) = self.selected_task_id() else {
            return;
        };
        let target = if forward {
            self.selected_column + 1
        } else {
            match self.selected_column.checked_sub(1) {
                Some(c) => c,
                None => return,
            }
        };
        let Some(&to) = Status::ALL.get(target) else {
            return;
        };
        let result = self
            .session
            .db
            .move_task(task_id, to, None, &self.session.actor, Utc::now());
        self.after_move(task_id, result);
    }

    fn force_pending(&mut self, task_id: u64, to: Status) {
        let result = self
            .session
            .db
            .force_move_task(task_id, to, Some("WIP limit overridden"), &self.session.actor, Utc::now());
        self.after_move(task_id, result);
    }

    fn after_move(&mut self, task_id: u64, result: crate::error::Result<MoveOutcome>) {
        match result {
            Ok(MoveOutcome::Moved { to, wip, .. }) => {
                if !self.save() {
                    return;
                }
                self.status_message = match wip {
                    WipState::AtCapacity => format!("Moved #{} to {} (column now full)", task_id, to),
                    WipState::OverCapacity => format!("Moved #{} to {} (over WIP limit)", task_id, to),
                    _ => format!("Moved #{} to {}", task_id, to),
                };
                self.update_columns();
                self.selected_column = to.column_index();
                self.selected_card = self.columns[self.selected_column]
                    .iter()
                    .position(|&id| id == task_id)
                    .unwrap_or(0);
                self.clamp_selection();
            }
            Ok(MoveOutcome::Unchanged) => {}
            Err(Error::PolicyViolation { column, limit, count }) => {
                self.mode = Mode::ConfirmForce { task_id, to: column };
                self.status_message = format!(
                    "{} is at its WIP limit ({}/{}). Press f to move anyway, any other key to cancel",
                    column, count, limit
                );
            }
            Err(e) => self.status_message = e.to_string(),
        }
    }

    fn submit_comment(&mut self) {
        let text = self.input.take();
        self.mode = Mode::Normal;
        let Some(task_id) = self.selected_task_id() else {
            return;
        };
        if text.trim().is_empty() {
            self.status_message = "Comment discarded".into();
            return;
        }
        match self
            .session
            .db
            .add_comment(task_id, &text, false, &self.session.actor, Utc::now())
        {
            Ok(_) => {
                if self.save() {
                    self.status_message = format!("Comment added to #{}", task_id);
                }
            }
            Err(e) => self.status_message = e.to_string(),
        }
    }

    fn cycle_priority_filter(&mut self) {
        self.filter.priority = match self.filter.priority {
            None => Some(Priority::High),
            Some(Priority::High) => Some(Priority::Medium),
            Some(Priority::Medium) => Some(Priority::Low),
            Some(Priority::Low) => None,
        };
        self.update_columns();
        self.status_message = match self.filter.priority {
            Some(p) => format!("Showing {} priority", format_priority(p)),
            None => "Showing all priorities".into(),
        };
    }

    fn toggle_mine(&mut self) {
        self.filter.assignee = match self.filter.assignee {
            Some(_) => None,
            None => Some(self.session.actor.clone()),
        };
        self.update_columns();
        self.status_message = if self.filter.assignee.is_some() {
            "Showing tasks assigned to you".into()
        } else {
            "Showing everyone's tasks".into()
        };
    }

    fn visible_count(&self) -> usize {
        self.columns.iter().map(|c| c.len()).sum()
    }

    /// Apply one key press. Returns true when the board should close.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        match self.mode {
            Mode::Filter => {
                match key.code {
                    KeyCode::Esc => {
                        self.mode = Mode::Normal;
                        self.input.clear();
                        self.filter.search.clear();
                        self.update_columns();
                        self.status_message.clear();
                    }
                    KeyCode::Enter => {
                        self.mode = Mode::Normal;
                        self.status_message = if self.filter.search.is_empty() {
                            "Filter cleared".into()
                        } else {
                            format!("Filter: '{}' ({} tasks shown)", self.filter.search, self.visible_count())
                        };
                    }
                    KeyCode::Backspace => self.input.handle_backspace(),
                    KeyCode::Delete => self.input.handle_delete(),
                    KeyCode::Left => self.input.move_cursor_left(),
                    KeyCode::Right => self.input.move_cursor_right(),
                    KeyCode::Char(c) => self.input.handle_char(c),
                    _ => {}
                }
                if self.mode == Mode::Filter {
                    self.filter.search = self.input.value.clone();
                    self.update_columns();
                }
                return false;
            }
            Mode::Comment => {
                match key.code {
                    KeyCode::Esc => {
                        self.mode = Mode::Normal;
                        self.input.clear();
                        self.status_message = "Comment discarded".into();
                    }
                    KeyCode::Enter => self.submit_comment(),
                    KeyCode::Backspace => self.input.handle_backspace(),
                    KeyCode::Delete => self.input.handle_delete(),
                    KeyCode::Left => self.input.move_cursor_left(),
                    KeyCode::Right => self.input.move_cursor_right(),
                    KeyCode::Char(c) => self.input.handle_char(c),
                    _ => {}
                }
                return false;
            }
            Mode::ConfirmForce { task_id, to } => {
                self.mode = Mode::Normal;
                if key.code == KeyCode::Char('f') {
                    self.force_pending(task_id, to);
                } else {
                    self.status_message = "Move cancelled".into();
                }
                return false;
            }
            Mode::Normal => {}
        }

        self.status_message.clear();
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Char('q') | KeyCode::Esc => return true,

            KeyCode::Enter => self.show_task_detail = !self.show_task_detail,

            KeyCode::Left if key.modifiers.contains(KeyModifiers::CONTROL) => self.move_selected(false),
            KeyCode::Right if key.modifiers.contains(KeyModifiers::CONTROL) => self.move_selected(true),
            KeyCode::Char('<') => self.move_selected(false),
            KeyCode::Char('>') => self.move_selected(true),

            KeyCode::Left => {
                if self.selected_column > 0 {
                    self.selected_column -= 1;
                    self.clamp_selection();
                }
            }
            KeyCode::Right => {
                if self.selected_column < COLUMN_COUNT - 1 {
                    self.selected_column += 1;
                    self.clamp_selection();
                }
            }
            KeyCode::Up => {
                self.selected_card = self.selected_card.saturating_sub(1);
            }
            KeyCode::Down => {
                let len = self.columns[self.selected_column].len();
                if len > 0 && self.selected_card < len - 1 {
                    self.selected_card += 1;
                }
            }

            KeyCode::Char('/') => {
                self.mode = Mode::Filter;
                self.input = InputField::with_value(&self.filter.search);
            }
            KeyCode::Char('p') => self.cycle_priority_filter(),
            KeyCode::Char('m') => self.toggle_mine(),
            KeyCode::Char('x') => {
                self.filter = FilterState::default();
                self.update_columns();
                self.status_message = "Filters cleared".into();
            }
            KeyCode::Char('c') => {
                if self.selected_task_id().is_some() {
                    self.mode = Mode::Comment;
                    self.input.clear();
                }
            }
            KeyCode::Char('h') => {
                self.status_message = "Enter: Details | Ctrl+←/→ or </>: Move | c: Comment | /: Search | p: Priority | m: Mine | x: Clear filters | q: Quit".into();
            }
            _ => {}
        }
        false
    }

    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Board
                Constraint::Length(1), // Status bar
            ])
            .split(f.area());

        self.render_header(f, chunks[0]);
        self.render_board(f, chunks[1]);
        self.render_status_bar(f, chunks[2]);

        if self.show_task_detail {
            self.render_task_detail_popup(f);
        }
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let snap = compute_team_energy(
            self.session.db.tasks(),
            Utc::now(),
            &self.session.config.energy_settings(),
        );
        let energy_color = match snap.level {
            crate::fields::EnergyLevel::Low => Color::Green,
            crate::fields::EnergyLevel::Medium => Color::Yellow,
            crate::fields::EnergyLevel::High => AMBER,
            crate::fields::EnergyLevel::Critical => RED,
        };
        let header = Line::from(vec![
            Span::styled("CHRONOS FLOW", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(
                format!("Energy: {:?} ({:.0})", snap.level, snap.score),
                Style::default().fg(energy_color),
            ),
            Span::raw("  "),
            Span::styled(
                format!("Acting as: {}", self.session.actor),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
            ),
        ]);
        let block = Paragraph::new(vec![header])
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(block, area);
    }

    fn render_board(&mut self, f: &mut Frame, area: Rect) {
        let constraints: Vec<Constraint> = (0..COLUMN_COUNT)
            .map(|_| Constraint::Ratio(1, COLUMN_COUNT as u32))
            .collect();
        let layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(area);
        for (i, &column_area) in layout.iter().enumerate() {
            self.render_column(f, column_area, i);
        }
    }

    fn column_title(&self, index: usize) -> (String, Color) {
        let status = Status::ALL[index];
        let Some(col) = self.session.db.column(status) else {
            return (format_status(status).to_string(), status_color(status));
        };
        let count = col.task_ids.len();
        match col.wip_limit {
            Some(limit) => {
                let (marker, color) = match col.wip_state() {
                    WipState::AtCapacity => (" FULL", AMBER),
                    WipState::OverCapacity => (" OVER", RED),
                    _ => ("", status_color(status)),
                };
                (format!("{} {}/{}{}", col.title, count, limit, marker), color)
            }
            None => (format!("{} ({})", col.title, count), status_color(status)),
        }
    }

    fn render_column(&mut self, f: &mut Frame, area: Rect, column_index: usize) {
        let is_selected = column_index == self.selected_column;
        let (title, color) = self.column_title(column_index);
        let border_style = if is_selected {
            Style::default().fg(color).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(color)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(border_style);
        let inner = block.inner(area);
        f.render_widget(block, area);

        let card_height = 5;
        let available_height = inner.height as usize;
        let visible_cards = available_height / card_height;
        let cards_len = self.columns[column_index].len();
        if cards_len == 0 {
            return;
        }

        let scroll_offset = if is_selected {
            let start = self.column_scroll_offsets[column_index];
            let end = start + visible_cards;
            if self.selected_card < start {
                self.selected_card
            } else if self.selected_card >= end && visible_cards > 0 {
                self.selected_card + 1 - visible_cards
            } else {
                start
            }
        } else {
            self.column_scroll_offsets[column_index]
        };
        self.column_scroll_offsets[column_index] = scroll_offset;

        let card_bg = Status::ALL
            .get(column_index)
            .and_then(|s| self.session.db.column_def(*s))
            .and_then(|c| parse_hex(&c.color))
            .unwrap_or(Color::Gray);

        let mut current_y = 0;
        let mut rendered = 0;
        for (card_index, &task_id) in self.columns[column_index].iter().enumerate().skip(scroll_offset) {
            let Some(task) = self.session.db.get(task_id) else {
                continue;
            };
            if current_y + card_height > available_height {
                break;
            }
            let card_area = Rect {
                x: inner.x,
                y: inner.y + current_y as u16,
                width: inner.width,
                height: card_height as u16,
            };
            let selected = is_selected && card_index == self.selected_card;
            self.render_card(f, card_area, task, selected, card_bg);
            current_y += card_height;
            rendered += 1;
        }

        if scroll_offset > 0 {
            let indicator = Paragraph::new(format!("▲ +{} above", scroll_offset)).style(Style::default().fg(Color::Cyan));
            f.render_widget(indicator, Rect { x: inner.x, y: inner.y, width: inner.width, height: 1 });
        }
        let remaining = cards_len.saturating_sub(scroll_offset + rendered);
        if remaining > 0 && inner.height > 0 {
            let indicator = Paragraph::new(format!("▼ +{} below", remaining)).style(Style::default().fg(Color::Cyan));
            f.render_widget(
                indicator,
                Rect { x: inner.x, y: inner.y + inner.height - 1, width: inner.width, height: 1 },
            );
        }
    }

    fn render_card(&self, f: &mut Frame, area: Rect, task: &Task, is_selected: bool, bg: Color) {
        let now = Utc::now();
        let style = if is_selected {
            Style::default().bg(bg).fg(Color::Black).add_modifier(Modifier::BOLD)
        } else {
            Style::default().bg(Color::DarkGray)
        };

        let priority_color = match task.priority {
            Priority::High => RED,
            Priority::Medium => AMBER,
            Priority::Low => Color::Gray,
        };
        let mut lines = vec![Line::from(vec![
            Span::raw(format!("#{} ", task.id)),
            Span::styled(format_priority(task.priority), Style::default().fg(priority_color)),
        ])];

        let width = area.width.saturating_sub(2) as usize;
        let mut title_lines: Vec<String> = Vec::new();
        let mut current = String::new();
        for word in task.title.split_whitespace() {
            if current.is_empty() {
                current = word.to_string();
            } else if current.chars().count() + 1 + word.chars().count() <= width {
                current.push(' ');
                current.push_str(word);
            } else {
                title_lines.push(std::mem::take(&mut current));
                current = word.to_string();
                if title_lines.len() >= 2 {
                    break;
                }
            }
        }
        if !current.is_empty() && title_lines.len() < 2 {
            title_lines.push(current);
        }
        lines.extend(title_lines.into_iter().map(|l| Line::from(truncate(&l, width.max(1)))));

        let due = format_due_relative(task.deadline, now);
        let due_style = if task.is_overdue(now) {
            Style::default().fg(RED)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::raw(format!("{} | ", self.session.db.initials_of(task.assignee.as_deref()))),
            Span::styled(due, due_style),
        ]));

        let card = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL))
            .style(style)
            .wrap(Wrap { trim: true });
        f.render_widget(card, area);
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let text = match self.mode {
            Mode::Filter => format!("Search: {} | Enter to apply, Esc to clear", self.input.value),
            Mode::Comment => format!("Comment: {} | Enter to post, Esc to discard", self.input.value),
            _ if !self.status_message.is_empty() => self.status_message.clone(),
            _ => {
                let filter = if self.filter.is_active() { " [filtered]" } else { "" };
                format!(
                    "Tasks: {}{} | Ctrl+←/→: Move | Enter: Details | c: Comment | /: Search | h: Help",
                    self.visible_count(),
                    filter
                )
            }
        };
        let bg = match self.mode {
            Mode::ConfirmForce { .. } => AMBER,
            _ => status_color(Status::ALL[self.selected_column]),
        };
        let status = Paragraph::new(text)
            .style(Style::default().bg(bg).fg(Color::White))
            .alignment(Alignment::Left);
        f.render_widget(status, area);
    }

    fn detail_lines(&self, task: &Task) -> Vec<Line<'static>> {
        let now = Utc::now();
        let db = &self.session.db;
        let tags = if task.tags.is_empty() {
            "-".to_string()
        } else {
            task.tags.iter().map(|t| format_tag(*t)).collect::<Vec<_>>().join(", ")
        };

        let mut lines = vec![
            Line::from(Span::styled(
                format!("Task #{}: {}", task.id, task.title),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(format!("Status:    {}", format_status(task.status))),
            Line::from(format!("Priority:  {}", format_priority(task.priority))),
            Line::from(format!(
                "Deadline:  {} ({})",
                task.deadline.format("%Y-%m-%d"),
                format_due_relative(task.deadline, now)
            )),
            Line::from(format!("Assignee:  {}", db.initials_of(task.assignee.as_deref()))),
            Line::from(format!("Tags:      {}", tags)),
            Line::from(format!("Reopened:  {}", task.reopen_count)),
            Line::from(""),
            Line::from(if task.description.is_empty() { "-".to_string() } else { task.description.clone() }),
            Line::from(""),
            Line::from(Span::styled("Time in status", Style::default().add_modifier(Modifier::UNDERLINED))),
        ];
        for st in Status::ALL {
            let mut ms = task.time_in_status.get(&st).copied().unwrap_or(0);
            if st == task.status {
                ms += task.current_stint_ms(now);
            }
            lines.push(Line::from(format!("  {:<12} {}", format_status(st), format_duration_ms(ms))));
        }

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Recent activity", Style::default().add_modifier(Modifier::UNDERLINED))));
        for e in task.activity_log.iter().rev().take(6) {
            let change = match (&e.previous_value, &e.new_value) {
                (Some(p), Some(n)) => format!(" {} -> {}", p, n),
                (None, Some(n)) => format!(" {}", n),
                _ => String::new(),
            };
            let note = e.comment.as_deref().map(|c| format!(" \"{}\"", c)).unwrap_or_default();
            lines.push(Line::from(format!(
                "  {} {:?}{}{}",
                e.timestamp.format("%m-%d %H:%M"),
                e.kind,
                change,
                note
            )));
        }

        if !task.comments.is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled("Comments", Style::default().add_modifier(Modifier::UNDERLINED))));
            for c in &task.comments {
                lines.push(Line::from(format!("  {}: {}", db.initials_of(Some(c.user.as_str())), c.content)));
                for r in &c.replies {
                    lines.push(Line::from(format!("    {}: {}", db.initials_of(Some(r.user.as_str())), r.content)));
                }
            }
        }
        lines
    }

    fn render_task_detail_popup(&self, f: &mut Frame) {
        let Some(task) = self.selected_task_id().and_then(|id| self.session.db.get(id)) else {
            return;
        };
        let area = f.area();
        let width = (area.width * 80) / 100;
        let height = (area.height * 80) / 100;
        let popup_area = Rect::new((area.width - width) / 2, (area.height - height) / 2, width, height);
        f.render_widget(Clear, popup_area);

        let popup_block = Block::default()
            .borders(Borders::ALL)
            .title("Task Details (Press Enter to close)")
            .title_alignment(Alignment::Center)
            .border_style(Style::default().fg(status_color(task.status)).add_modifier(Modifier::BOLD));
        let popup = Paragraph::new(self.detail_lines(task))
            .block(popup_block)
            .wrap(Wrap { trim: true })
            .style(Style::default().bg(Color::Black));
        f.render_widget(popup, popup_area);
    }

    /// Main event loop.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press && self.handle_key(key) {
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}

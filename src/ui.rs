use crate::chart::{ChartBackend, ChartInstance, PlotBackend, Rgb, Stroke};
use crate::config::Config;
use crate::dispatch::{Dispatcher, Reply};
use crate::gateway::{Gateway, HttpGateway};
use crate::habits::HabitDisplay;
use crate::journal::EMPTY_JOURNAL_MESSAGE;
use crate::selection::RangeDays;
use crate::session::{Effect, Session, SessionOptions};
use crate::storage::{load_preferences, preferences_path, save_preferences, Preferences, Theme};
use crate::toast::ToastLevel;
use crate::visibility::ChartState;
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Axis, Block, Borders, Chart, Clear, Dataset, GraphType, List, ListItem, ListState, Paragraph,
    Wrap,
};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub fn run(config: Config) -> Result<()> {
    let prefs_path = match preferences_path() {
        Ok(path) => Some(path),
        Err(err) => {
            warn!(error = %err, "preferences unavailable");
            None
        }
    };
    let prefs = prefs_path
        .as_deref()
        .map(|path| {
            load_preferences(path).unwrap_or_else(|err| {
                warn!(error = %err, "ignoring unreadable preferences");
                Preferences::default()
            })
        })
        .unwrap_or_default();

    let gateway: Arc<dyn Gateway> = Arc::new(HttpGateway::new(&config.server_url));
    let (dispatcher, replies) = Dispatcher::new(gateway);
    let backend: Option<Box<dyn ChartBackend>> = if config.charts {
        Some(Box::new(PlotBackend::new()))
    } else {
        warn!("charting disabled in config");
        None
    };
    let session = Session::new(
        SessionOptions {
            range: config.range(),
            seed_demo: config.seed_demo,
            toast_ttl: Duration::from_secs(config.toast_seconds),
        },
        backend,
    );

    let mut terminal = setup_terminal()?;
    let mut app = App {
        session,
        dispatcher,
        replies,
        server: config.server_url,
        theme: prefs.theme,
        prefs_path,
        view: View::Habits,
        mode: Mode::Normal,
        journal_draft: FieldValue::new(""),
        status: "Loading…".into(),
        habit_offset: 0,
        journal_offset: 0,
        timeline_scroll: 0,
        last_reply: None,
    };
    let effects = app.session.bootstrap();
    app.apply(effects);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    info!("paceboard exiting");
    result
}

struct App {
    session: Session,
    dispatcher: Dispatcher,
    replies: Receiver<Reply>,
    server: String,
    theme: Theme,
    prefs_path: Option<PathBuf>,
    view: View,
    mode: Mode,
    journal_draft: FieldValue,
    status: String,
    habit_offset: usize,
    journal_offset: usize,
    timeline_scroll: u16,
    last_reply: Option<Instant>,
}

enum Mode {
    Normal,
    Writing,
    Form(Form),
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum View {
    Habits,
    Journal,
    IdealSelf,
    Timeline,
}

impl View {
    fn label(&self) -> &'static str {
        match self {
            View::Habits => "Habits",
            View::Journal => "Journal",
            View::IdealSelf => "Ideal self",
            View::Timeline => "Timeline",
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum FormKind {
    AddHabit,
    IdealSelf,
}

impl FormKind {
    fn title(&self) -> &'static str {
        match self {
            FormKind::AddHabit => "New Habit",
            FormKind::IdealSelf => "Ideal Self",
        }
    }

    fn labels(&self) -> &'static [&'static str] {
        match self {
            FormKind::AddHabit => &["Name", "Color (#rrggbb)", "Target per week (1-7)"],
            FormKind::IdealSelf => &["Vision", "Focus areas (comma separated)"],
        }
    }

    /// Field where plain Enter inserts a newline instead of submitting.
    fn multiline_field(&self) -> Option<usize> {
        match self {
            FormKind::AddHabit => None,
            FormKind::IdealSelf => Some(0),
        }
    }
}

struct Form {
    kind: FormKind,
    fields: Vec<FieldValue>,
    active: usize,
}

impl Form {
    fn new(kind: FormKind, values: &[&str]) -> Self {
        let fields = kind
            .labels()
            .iter()
            .enumerate()
            .map(|(idx, _)| FieldValue::new(values.get(idx).copied().unwrap_or_default()))
            .collect();
        Form {
            kind,
            fields,
            active: 0,
        }
    }

    fn next_field(&mut self) {
        self.active = (self.active + 1) % self.fields.len();
    }

    fn prev_field(&mut self) {
        self.active = (self.active + self.fields.len() - 1) % self.fields.len();
    }

    fn active_field_mut(&mut self) -> &mut FieldValue {
        &mut self.fields[self.active]
    }

    fn value(&self, idx: usize) -> &str {
        self.fields
            .get(idx)
            .map(|f| f.value.as_str())
            .unwrap_or_default()
    }
}

#[derive(Clone)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor = prev_grapheme(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        self.cursor = next_grapheme(self.cursor, &self.value);
    }

    fn move_up(&mut self) {
        let (line_starts, line_idx, col) = line_state(&self.value, self.cursor);
        if line_idx == 0 {
            return;
        }
        let target_start = line_starts[line_idx - 1];
        self.cursor = index_at_col(&self.value, target_start, col);
    }

    fn move_down(&mut self) {
        let (line_starts, line_idx, col) = line_state(&self.value, self.cursor);
        if line_idx + 1 >= line_starts.len() {
            return;
        }
        let target_start = line_starts[line_idx + 1];
        self.cursor = index_at_col(&self.value, target_start, col);
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_grapheme(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }

    /// Shared editing keys. Returns false when the key was not consumed.
    fn edit(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Up => self.move_up(),
            KeyCode::Down => self.move_down(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.insert_char(c)
            }
            _ => return false,
        }
        true
    }
}

struct Palette {
    bg: Color,
    fg: Color,
    dim: Color,
    accent: Color,
    border: Color,
    highlight_bg: Color,
    highlight_fg: Color,
}

fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Dark => Palette {
            bg: Color::Rgb(16, 18, 24),
            fg: Color::White,
            dim: Color::Gray,
            accent: Color::Cyan,
            border: Color::DarkGray,
            highlight_bg: Color::LightCyan,
            highlight_fg: Color::Black,
        },
        Theme::Light => Palette {
            bg: Color::Rgb(246, 247, 249),
            fg: Color::Black,
            dim: Color::DarkGray,
            accent: Color::Blue,
            border: Color::Gray,
            highlight_bg: Color::LightBlue,
            highlight_fg: Color::Black,
        },
    }
}

/// Submitting input shortcut: Ctrl+Enter where the terminal reports it,
/// Ctrl+S everywhere else.
fn is_submit(key: &KeyEvent) -> bool {
    let control = key.modifiers.contains(KeyModifiers::CONTROL);
    control && matches!(key.code, KeyCode::Enter | KeyCode::Char('s'))
}

impl App {
    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            self.drain_replies();
            self.session.tick(Instant::now());
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(200))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key)? {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn drain_replies(&mut self) {
        while let Ok(reply) = self.replies.try_recv() {
            self.last_reply = Some(Instant::now());
            let effects = self.session.handle(reply);
            self.apply(effects);
        }
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Send(request) => self.dispatcher.submit(request),
                Effect::ClearJournalInput => self.journal_draft = FieldValue::new(""),
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        match self.mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Writing => {
                self.handle_writing_key(key);
                Ok(false)
            }
            Mode::Form(_) => {
                self.handle_form_key(key);
                Ok(false)
            }
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('1') => self.set_view(View::Habits),
            KeyCode::Char('2') => self.set_view(View::Journal),
            KeyCode::Char('3') => self.set_view(View::IdealSelf),
            KeyCode::Char('4') => self.set_view(View::Timeline),
            KeyCode::Char('t') => self.toggle_theme(),
            KeyCode::Char('r') => {
                let mut effects = self.session.refresh();
                if self.view == View::Timeline {
                    effects.extend(self.session.load_timeline());
                }
                self.apply(effects);
                self.status = "Refreshing…".into();
            }
            _ => match self.view {
                View::Habits => self.handle_habits_key(key),
                View::Journal => self.handle_journal_key(key),
                View::IdealSelf => self.handle_ideal_self_key(key),
                View::Timeline => self.handle_timeline_key(key),
            },
        }
        Ok(false)
    }

    fn handle_habits_key(&mut self, key: KeyEvent) {
        let effects = match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.session.habits_mut().cursor_up();
                Vec::new()
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.session.habits_mut().cursor_down();
                Vec::new()
            }
            KeyCode::Enter | KeyCode::Char('v') => match self.cursor_habit() {
                Some(row) => {
                    self.status = format!("Viewing progress for {}", row.name);
                    self.session.view_progress(&row.id)
                }
                None => {
                    self.status = "No habit selected".into();
                    Vec::new()
                }
            },
            KeyCode::Char(' ') => match self.cursor_habit() {
                Some(row) => {
                    self.status = format!("Updating {}…", row.name);
                    self.session.toggle_completion(&row.id)
                }
                None => Vec::new(),
            },
            KeyCode::Char('s') | KeyCode::Tab => self.session.step_selector(1),
            KeyCode::Char('S') | KeyCode::BackTab => self.session.step_selector(-1),
            KeyCode::Char(']') => {
                let next = self.session.selection().range().next();
                self.session.set_range(next)
            }
            KeyCode::Char('[') => {
                let prev = self.session.selection().range().prev();
                self.session.set_range(prev)
            }
            KeyCode::Char('a') | KeyCode::Char('n') => {
                self.mode = Mode::Form(Form::new(FormKind::AddHabit, &[]));
                self.status =
                    "New habit (Tab/Shift-Tab move, Ctrl+Enter or Ctrl+S save, Esc cancel)".into();
                Vec::new()
            }
            _ => Vec::new(),
        };
        self.apply(effects);
    }

    fn handle_journal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.session.journal_mut().cursor_up(),
            KeyCode::Down | KeyCode::Char('j') => self.session.journal_mut().cursor_down(),
            KeyCode::Char('i') | KeyCode::Char('w') | KeyCode::Enter => {
                self.mode = Mode::Writing;
                self.status = "Writing (Ctrl+Enter or Ctrl+S save, Esc keeps draft)".into();
            }
            _ => {}
        }
    }

    fn handle_ideal_self_key(&mut self, key: KeyEvent) {
        if let KeyCode::Char('e') | KeyCode::Enter = key.code {
            let (vision, focus) = self.session.ideal_self().form_values();
            self.mode = Mode::Form(Form::new(FormKind::IdealSelf, &[&vision, &focus]));
            self.status = "Editing ideal self (Enter adds a line in Vision, Ctrl+S save)".into();
        }
    }

    fn handle_timeline_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.timeline_scroll = self.timeline_scroll.saturating_sub(1)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.timeline_scroll = self.timeline_scroll.saturating_add(1)
            }
            KeyCode::PageUp => self.timeline_scroll = self.timeline_scroll.saturating_sub(10),
            KeyCode::PageDown => self.timeline_scroll = self.timeline_scroll.saturating_add(10),
            KeyCode::Home | KeyCode::Char('g') => self.timeline_scroll = 0,
            _ => {}
        }
    }

    fn handle_writing_key(&mut self, key: KeyEvent) {
        if is_submit(&key) {
            match self.session.submit_journal(&self.journal_draft.value) {
                Ok(effects) => {
                    self.apply(effects);
                    self.mode = Mode::Normal;
                    self.status = "Saving entry…".into();
                }
                Err(err) => self.status = format!("Not saved: {}", err),
            }
            return;
        }
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.status = "Draft kept".into();
            }
            KeyCode::Enter => self.journal_draft.insert_char('\n'),
            _ => {
                self.journal_draft.edit(key);
            }
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        let mut mode = std::mem::replace(&mut self.mode, Mode::Normal);
        let close_form = match &mut mode {
            Mode::Form(form) => self.process_form_key(form, key),
            _ => true,
        };
        self.mode = if close_form { Mode::Normal } else { mode };
    }

    fn process_form_key(&mut self, form: &mut Form, key: KeyEvent) -> bool {
        if is_submit(&key) {
            return self.try_submit(form);
        }
        match key.code {
            KeyCode::Esc => {
                self.status = "Canceled".into();
                return true;
            }
            KeyCode::Tab => form.next_field(),
            KeyCode::BackTab => form.prev_field(),
            KeyCode::Enter => {
                if form.kind.multiline_field() == Some(form.active) {
                    form.active_field_mut().insert_char('\n');
                } else {
                    return self.try_submit(form);
                }
            }
            _ => {
                form.active_field_mut().edit(key);
            }
        }
        false
    }

    fn try_submit(&mut self, form: &Form) -> bool {
        match form.kind {
            FormKind::AddHabit => {
                match self
                    .session
                    .add_habit(form.value(0), form.value(1), form.value(2))
                {
                    Ok(effects) => {
                        self.apply(effects);
                        self.status = format!("Adding {}…", form.value(0).trim());
                        true
                    }
                    Err(err) => {
                        self.status = format!("Could not add: {}", err);
                        false
                    }
                }
            }
            FormKind::IdealSelf => {
                let effects = self.session.save_ideal_self(form.value(0), form.value(1));
                self.apply(effects);
                self.status = "Saving ideal self…".into();
                true
            }
        }
    }

    fn set_view(&mut self, view: View) {
        if self.view != view {
            self.view = view;
            self.status = format!("Switched to {} view", view.label());
        }
        if view == View::Timeline && self.session.timeline().is_none() {
            let effects = self.session.load_timeline();
            self.apply(effects);
        }
    }

    fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        let Some(path) = self.prefs_path.as_deref() else {
            self.status = "Theme changed for this session".into();
            return;
        };
        let prefs = Preferences { theme: self.theme };
        match save_preferences(path, &prefs) {
            Ok(()) => self.status = "Theme saved".into(),
            Err(err) => {
                warn!(error = %err, "saving preferences failed");
                self.status = format!("Could not save theme: {:#}", err);
            }
        }
    }

    fn cursor_habit(&self) -> Option<HabitDisplay> {
        self.session.habits().cursor_row().cloned()
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let p = palette(self.theme);
        f.render_widget(
            Block::default().style(Style::default().bg(p.bg).fg(p.fg)),
            f.size(),
        );
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0], &p);
        match self.view {
            View::Habits => self.draw_habits(f, layout[1], &p),
            View::Journal => self.draw_journal(f, layout[1], &p),
            View::IdealSelf => self.draw_ideal_self(f, layout[1], &p),
            View::Timeline => self.draw_timeline(f, layout[1], &p),
        }
        self.draw_footer(f, layout[2], &p);

        if let Mode::Form(form) = &self.mode {
            draw_form(f, form, &p);
        }
        self.draw_toasts(f, layout[1], &p);
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect, p: &Palette) {
        let mut spans = vec![
            Span::styled(
                "paceboard ",
                Style::default().fg(p.accent).add_modifier(Modifier::BOLD),
            ),
            Span::styled(self.server.clone(), Style::default().fg(p.dim)),
        ];
        for view in [View::Habits, View::Journal, View::IdealSelf, View::Timeline] {
            spans.push(Span::raw("  •  "));
            let style = if view == self.view {
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
            } else {
                Style::default().fg(p.dim)
            };
            spans.push(Span::styled(view.label().to_lowercase(), style));
        }
        spans.push(Span::raw("  •  "));
        let sync = match (self.session.in_flight(), self.last_reply) {
            (n, _) if n > 0 => format!("working ({})", n),
            (_, Some(last)) => format!("synced {}", format_elapsed(last)),
            (_, None) => "connecting".to_string(),
        };
        spans.push(Span::styled(sync, Style::default().fg(p.dim)));

        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(p.border));
        let paragraph = Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_habits(&mut self, f: &mut ratatui::Frame<'_>, area: Rect, p: &Palette) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(42), Constraint::Percentage(58)])
            .split(area);
        self.draw_habit_list(f, columns[0], p);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(6)])
            .split(columns[1]);
        self.draw_controls(f, right[0], p);
        self.draw_chart_area(f, right[1], p);
    }

    fn draw_habit_list(&mut self, f: &mut ratatui::Frame<'_>, area: Rect, p: &Palette) {
        let habits = self.session.habits();
        let current = self.session.selection().current_habit();
        let width = area.width.saturating_sub(2);
        let items: Vec<ListItem<'static>> = if habits.is_empty() {
            vec![ListItem::new("No habits yet. Press a to add one.")]
        } else {
            habits
                .rows()
                .iter()
                .map(|row| habit_item(row, current == Some(&row.id), width, p))
                .collect()
        };
        let len = habits.rows().len();
        let cursor = habits.cursor();

        let mut state = ListState::default();
        // four lines per habit
        let viewport = (area.height.saturating_sub(2) / 4) as usize;
        let offset = adjust_offset(cursor, self.habit_offset, viewport, 0, len);
        *state.offset_mut() = offset;
        if len > 0 {
            state.select(Some(cursor));
        }
        let block = panel_block(format!("Habits ({})", len), true, p);
        let list = List::new(items).block(block).highlight_style(
            Style::default()
                .bg(p.highlight_bg)
                .fg(p.highlight_fg)
                .add_modifier(Modifier::BOLD),
        );
        f.render_stateful_widget(list, area, &mut state);
        self.habit_offset = offset;
    }

    fn draw_controls(&self, f: &mut ratatui::Frame<'_>, area: Rect, p: &Palette) {
        let selector = self.session.habits().selector();
        let label_style = Style::default().fg(p.dim).add_modifier(Modifier::BOLD);
        let selector_line = if selector.is_enabled() {
            Line::from(vec![
                Span::styled("Habit  ", label_style),
                Span::styled("◀ ", Style::default().fg(p.accent)),
                Span::styled(
                    selector.selected_label().to_string(),
                    Style::default().fg(p.fg).add_modifier(Modifier::BOLD),
                ),
                Span::styled(" ▶", Style::default().fg(p.accent)),
                Span::styled(
                    format!("  {} of {}", self.selector_position(), selector.options().len()),
                    Style::default().fg(p.dim),
                ),
            ])
        } else {
            Line::from(vec![
                Span::styled("Habit  ", label_style),
                Span::styled(
                    selector.selected_label().to_string(),
                    Style::default().fg(p.dim).add_modifier(Modifier::DIM),
                ),
            ])
        };

        let enabled = self.session.selection().range_enabled();
        let active = self.session.selection().range();
        let mut range_spans = vec![Span::styled("Range  ", label_style)];
        for range in RangeDays::ALL {
            let style = if !enabled {
                Style::default().fg(p.dim).add_modifier(Modifier::DIM)
            } else if range == active {
                Style::default()
                    .bg(p.highlight_bg)
                    .fg(p.highlight_fg)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(p.fg)
            };
            range_spans.push(Span::styled(format!(" {} ", range.label()), style));
            range_spans.push(Span::raw(" "));
        }

        let paragraph = Paragraph::new(vec![selector_line, Line::from(range_spans)])
            .block(panel_block("Progress".to_string(), false, p));
        f.render_widget(paragraph, area);
    }

    fn selector_position(&self) -> usize {
        let selector = self.session.habits().selector();
        let selected = selector.selected().and_then(|o| o.value.as_ref());
        selector
            .options()
            .iter()
            .position(|o| o.value.as_ref() == selected)
            .map(|idx| idx + 1)
            .unwrap_or_default()
    }

    fn draw_chart_area(&self, f: &mut ratatui::Frame<'_>, area: Rect, p: &Palette) {
        let visibility = self.session.chart().visibility();
        let chart = visibility
            .chart()
            .filter(|_| visibility.chart_surface().shown);
        match chart {
            Some(chart) => draw_chart(f, area, chart, p),
            None => {
                let style = match visibility.state() {
                    ChartState::Error => Style::default().fg(Color::LightRed),
                    ChartState::Loading => Style::default()
                        .fg(p.dim)
                        .add_modifier(Modifier::ITALIC),
                    _ => Style::default().fg(p.dim),
                };
                let inner_height = area.height.saturating_sub(2);
                let mut lines = vec![Line::from(""); (inner_height / 2) as usize];
                lines.push(Line::from(Span::styled(
                    visibility.message().to_string(),
                    style,
                )));
                let placeholder = Paragraph::new(lines)
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true })
                    .block(panel_block("Ideal vs actual".to_string(), false, p));
                f.render_widget(placeholder, area);
            }
        }
    }

    fn draw_journal(&mut self, f: &mut ratatui::Frame<'_>, area: Rect, p: &Palette) {
        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(6), Constraint::Min(4)])
            .split(area);

        let writing = matches!(self.mode, Mode::Writing);
        let draft = if writing {
            self.journal_draft.with_caret()
        } else if self.journal_draft.value.is_empty() {
            "Press i to write an entry".to_string()
        } else {
            self.journal_draft.value.clone()
        };
        let input = Paragraph::new(draft)
            .style(Style::default().fg(if writing { p.accent } else { p.dim }))
            .wrap(Wrap { trim: false })
            .block(panel_block("New entry".to_string(), writing, p));
        f.render_widget(input, sections[0]);

        let journal = self.session.journal();
        let entries = journal.entries();
        let width = sections[1].width.saturating_sub(4) as usize;
        let items: Vec<ListItem<'static>> = if entries.is_empty() {
            vec![ListItem::new(EMPTY_JOURNAL_MESSAGE)]
        } else {
            entries
                .iter()
                .map(|entry| {
                    ListItem::new(vec![
                        Line::from(Span::styled(
                            entry.display_timestamp(),
                            Style::default().fg(Color::LightYellow),
                        )),
                        Line::from(Span::styled(
                            truncate_text(&entry.content.replace('\n', " "), width),
                            Style::default().fg(p.fg),
                        )),
                    ])
                })
                .collect()
        };
        let len = entries.len();
        let cursor = journal.cursor();
        let mut state = ListState::default();
        let viewport = (sections[1].height.saturating_sub(2) / 2) as usize;
        let offset = adjust_offset(cursor, self.journal_offset, viewport, 1, len);
        *state.offset_mut() = offset;
        if len > 0 && !writing {
            state.select(Some(cursor));
        }
        let list = List::new(items)
            .block(panel_block(format!("Journal ({})", len), !writing, p))
            .highlight_style(Style::default().bg(p.highlight_bg).fg(p.highlight_fg));
        f.render_stateful_widget(list, sections[1], &mut state);
        self.journal_offset = offset;
    }

    fn draw_ideal_self(&self, f: &mut ratatui::Frame<'_>, area: Rect, p: &Palette) {
        let panel = self.session.ideal_self();
        let heading = Style::default()
            .fg(Color::LightMagenta)
            .add_modifier(Modifier::BOLD);
        let lines = match panel.summary() {
            Some(record) => {
                let mut lines = vec![Line::from(Span::styled("Vision", heading))];
                lines.extend(
                    record
                        .vision
                        .lines()
                        .map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(p.fg)))),
                );
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled("Focus areas", heading)));
                if record.focus_areas.is_empty() {
                    lines.push(Line::from(Span::styled("(none)", Style::default().fg(p.dim))));
                }
                for focus in &record.focus_areas {
                    lines.push(Line::from(vec![
                        Span::styled("• ", Style::default().fg(p.accent)),
                        Span::styled(focus.clone(), Style::default().fg(p.fg)),
                    ]));
                }
                lines
            }
            None if !panel.is_loaded() => vec![Line::from(Span::styled(
                "Loading…",
                Style::default().fg(p.dim).add_modifier(Modifier::ITALIC),
            ))],
            None => vec![Line::from(Span::styled(
                "Nothing here yet. Press e to describe who you want to become.",
                Style::default().fg(p.dim),
            ))],
        };
        let paragraph = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(panel_block("Ideal self".to_string(), true, p));
        f.render_widget(paragraph, area);
    }

    fn draw_timeline(&self, f: &mut ratatui::Frame<'_>, area: Rect, p: &Palette) {
        let text = match self.session.timeline() {
            Some(text) if !text.trim().is_empty() => text.to_string(),
            Some(_) => "Timeline is empty.".to_string(),
            None => "Loading timeline… (r to reload)".to_string(),
        };
        let paragraph = Paragraph::new(text)
            .style(Style::default().fg(p.fg))
            .scroll((self.timeline_scroll, 0))
            .block(panel_block("Timeline".to_string(), true, p));
        f.render_widget(paragraph, area);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect, p: &Palette) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(self.footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(p.border)),
            );
        f.render_widget(help_bar, rows[0]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rows[1]);

        let status = Paragraph::new(self.status.clone())
            .style(Style::default().fg(p.dim))
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(p.border)),
            );
        f.render_widget(status, bottom[0]);

        let (detail_lines, title) = self.detail_content(p);
        let detail = Paragraph::new(detail_lines)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(p.border))
                    .title(title),
            );
        f.render_widget(detail, bottom[1]);
    }

    fn footer_help_line(&self) -> Line<'static> {
        let key = |k: &'static str, color: Color| Span::styled(k, Style::default().fg(color));
        let mut spans = vec![
            key("1-4", Color::LightCyan),
            Span::raw(" views  "),
        ];
        match (&self.mode, self.view) {
            (Mode::Writing, _) => spans.extend([
                key("Ctrl+S", Color::LightGreen),
                Span::raw(" save  "),
                key("Enter", Color::LightCyan),
                Span::raw(" newline  "),
                key("Esc", Color::LightRed),
                Span::raw(" stop writing"),
            ]),
            (_, View::Habits) => spans.extend([
                key("j k", Color::LightCyan),
                Span::raw(" move  "),
                key("Enter", Color::LightYellow),
                Span::raw(" progress  "),
                key("Space", Color::LightGreen),
                Span::raw(" done  "),
                key("s/S", Color::LightCyan),
                Span::raw(" habit  "),
                key("[ ]", Color::LightCyan),
                Span::raw(" range  "),
                key("a", Color::LightMagenta),
                Span::raw(" add  "),
            ]),
            (_, View::Journal) => spans.extend([
                key("j k", Color::LightCyan),
                Span::raw(" browse  "),
                key("i", Color::LightMagenta),
                Span::raw(" write  "),
            ]),
            (_, View::IdealSelf) => spans.extend([
                key("e", Color::LightYellow),
                Span::raw(" edit  "),
            ]),
            (_, View::Timeline) => spans.extend([
                key("j k", Color::LightCyan),
                Span::raw(" scroll  "),
            ]),
        }
        if !matches!(self.mode, Mode::Writing) {
            spans.extend([
                key("r", Color::LightGreen),
                Span::raw(" refresh  "),
                key("t", Color::LightYellow),
                Span::raw(" theme  "),
                key("q", Color::LightRed),
                Span::raw(" quit"),
            ]);
        }
        Line::from(spans)
    }

    fn detail_content(&self, p: &Palette) -> (Vec<Line<'static>>, String) {
        match self.view {
            View::Habits => {
                let Some(habit) = self
                    .cursor_habit()
                    .and_then(|row| self.session.habits().get(&row.id))
                else {
                    return (vec![Line::from("No habit selected")], "Selected".into());
                };
                let mut spans = vec![Span::styled(
                    habit.name.clone(),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )];
                if let Some(days) = habit.completed_days {
                    spans.push(Span::raw(format!("  {} days done", days)));
                }
                if let Some(last) = &habit.last_completed {
                    spans.push(Span::styled(
                        format!("  last {}", last),
                        Style::default().fg(p.dim),
                    ));
                }
                if let Some(created) = &habit.created_at {
                    spans.push(Span::styled(
                        format!("  since {}", created),
                        Style::default().fg(p.dim).add_modifier(Modifier::DIM),
                    ));
                }
                (vec![Line::from(spans)], "Selected".into())
            }
            View::Journal => {
                let journal = self.session.journal();
                match journal.entries().get(journal.cursor()) {
                    Some(entry) => (
                        vec![Line::from(entry.content.clone())],
                        entry.display_timestamp(),
                    ),
                    None => (vec![Line::from(EMPTY_JOURNAL_MESSAGE)], "Entry".into()),
                }
            }
            View::IdealSelf | View::Timeline => {
                let count = self.session.habits().rows().len();
                (
                    vec![Line::from(format!(
                        "{} habit(s), {} journal entries",
                        count,
                        self.session.journal().entries().len()
                    ))],
                    "Overview".into(),
                )
            }
        }
    }

    /// Newest toasts at the top right corner of the body. Drawn last and
    /// never focused, so input is unaffected.
    fn draw_toasts(&self, f: &mut ratatui::Frame<'_>, area: Rect, p: &Palette) {
        let width = area.width.min(44);
        let mut y = area.y;
        let toasts: Vec<_> = self.session.toasts().visible().collect();
        for toast in toasts.iter().rev() {
            if y + 3 > area.y + area.height {
                break;
            }
            let rect = Rect::new(area.x + area.width - width, y, width, 3);
            let color = match toast.level {
                ToastLevel::Info => p.accent,
                ToastLevel::Success => Color::LightGreen,
                ToastLevel::Error => Color::LightRed,
            };
            let body = Paragraph::new(truncate_text(&toast.message, width.saturating_sub(2) as usize))
                .style(Style::default().fg(p.fg).bg(p.bg))
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(color)),
                );
            f.render_widget(Clear, rect);
            f.render_widget(body, rect);
            y += 3;
        }
    }
}

fn panel_block(title: String, focused: bool, p: &Palette) -> Block<'static> {
    Block::default()
        .title(Span::styled(
            title,
            Style::default()
                .fg(if focused { p.accent } else { p.dim })
                .add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { p.accent } else { p.border }))
}

fn to_color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

/// Fills are drawn first so both lines stay on top of the shaded area.
fn draw_chart(f: &mut ratatui::Frame<'_>, area: Rect, chart: &ChartInstance, p: &Palette) {
    let mut datasets = Vec::new();
    for series in chart.series.iter().filter(|s| !s.fill.is_empty()) {
        datasets.push(
            Dataset::default()
                .marker(Marker::Braille)
                .graph_type(GraphType::Scatter)
                .style(Style::default().fg(to_color(series.color.dimmed(0.35))))
                .data(&series.fill),
        );
    }
    for series in &chart.series {
        let graph_type = match series.stroke {
            Stroke::Solid => GraphType::Line,
            Stroke::Dashed => GraphType::Scatter,
        };
        datasets.push(
            Dataset::default()
                .name(series.label.clone())
                .marker(Marker::Braille)
                .graph_type(graph_type)
                .style(Style::default().fg(to_color(series.color)))
                .data(&series.line),
        );
    }

    let x_labels: Vec<Span> = chart
        .axis_labels()
        .into_iter()
        .map(|l| Span::styled(l.to_string(), Style::default().fg(p.dim)))
        .collect();
    let top = chart.y_bounds[1];
    let y_labels: Vec<Span> = [0.0, top / 2.0, top]
        .iter()
        .map(|v| Span::styled(format!("{:.0}", v), Style::default().fg(p.dim)))
        .collect();

    let widget = Chart::new(datasets)
        .block(panel_block(chart.title.clone(), false, p))
        .x_axis(
            Axis::default()
                .style(Style::default().fg(p.border))
                .bounds(chart.x_bounds)
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(p.border))
                .bounds(chart.y_bounds)
                .labels(y_labels),
        );
    f.render_widget(widget, area);
}

fn habit_item(row: &HabitDisplay, current: bool, width: u16, p: &Palette) -> ListItem<'static> {
    let swatch = Rgb::from_hex(&row.color).map(to_color).unwrap_or(p.accent);
    let bar_width = (width.saturating_sub(20) as usize).clamp(6, 30);
    let marker = if current { "▶ " } else { "  " };
    let badge_style = if row.completed {
        Style::default()
            .fg(Color::LightGreen)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(p.dim)
    };
    let lines = vec![
        Line::from(vec![
            Span::styled(marker, Style::default().fg(p.accent)),
            Span::styled("● ", Style::default().fg(swatch)),
            Span::styled(
                truncate_text(&row.name, width.saturating_sub(18) as usize),
                Style::default().fg(p.fg).add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(format!("[{}]", row.badge), badge_style),
        ]),
        Line::from(Span::styled(
            format!(
                "    {}  {}  score {}",
                row.target_label, row.streak_label, row.score_label
            ),
            Style::default().fg(p.dim),
        )),
        Line::from(vec![
            Span::styled("    ideal  ", Style::default().fg(p.dim)),
            Span::styled(
                bar(row.ideal_bar, bar_width),
                Style::default().fg(to_color(Rgb::SLATE)),
            ),
            Span::styled(format!(" {:>3.0}%", row.ideal_bar), Style::default().fg(p.dim)),
        ]),
        Line::from(vec![
            Span::styled("    actual ", Style::default().fg(p.dim)),
            Span::styled(bar(row.actual_bar, bar_width), Style::default().fg(swatch)),
            Span::styled(format!(" {:>3.0}%", row.actual_bar), Style::default().fg(p.dim)),
        ]),
    ];
    ListItem::new(lines)
}

/// Horizontal bar for a percentage already clamped to 0..=100.
fn bar(percent: f64, width: usize) -> String {
    let filled = ((percent / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

fn draw_form(f: &mut ratatui::Frame<'_>, form: &Form, p: &Palette) {
    let area = centered_rect(70, 60, f.size());
    let mut lines = Vec::new();
    for (idx, label) in form.kind.labels().iter().enumerate() {
        lines.extend(field_lines(label, &form.fields[idx], idx == form.active, p));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Ctrl+Enter or Ctrl+S to save • Esc to cancel • Tab/Shift-Tab to move",
        Style::default().fg(p.dim),
    )));
    let dialog = Paragraph::new(lines)
        .style(Style::default().bg(p.bg))
        .block(
            Block::default()
                .title(Span::styled(
                    form.kind.title(),
                    Style::default().fg(p.accent).add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(p.accent)),
        )
        .wrap(Wrap { trim: true });

    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
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
        .split(popup_layout[1])[1]
}

fn adjust_offset(
    selected: usize,
    current_offset: usize,
    viewport: usize,
    scrolloff: usize,
    len: usize,
) -> usize {
    if viewport == 0 || len == 0 {
        return 0;
    }
    let max_offset = len.saturating_sub(viewport);
    let margin = scrolloff.min(viewport.saturating_sub(1));
    let mut offset = current_offset.min(max_offset);
    if selected < offset.saturating_add(margin) {
        offset = selected.saturating_sub(margin);
    } else {
        let upper = offset
            .saturating_add(viewport.saturating_sub(1))
            .saturating_sub(margin);
        if selected > upper {
            offset = selected.saturating_add(margin + 1).saturating_sub(viewport);
        }
    }
    offset.min(max_offset)
}

fn prev_grapheme(cursor: usize, text: &str) -> usize {
    if cursor == 0 {
        return 0;
    }
    let mut prev = 0;
    for (idx, _) in text.char_indices() {
        if idx >= cursor {
            break;
        }
        prev = idx;
    }
    prev
}

fn next_grapheme(cursor: usize, text: &str) -> usize {
    for (idx, ch) in text.char_indices() {
        if idx > cursor {
            return idx;
        }
        if idx == cursor {
            return cursor + ch.len_utf8();
        }
    }
    text.len()
}

fn line_state(text: &str, cursor: usize) -> (Vec<usize>, usize, usize) {
    let mut starts = vec![0];
    for (idx, ch) in text.char_indices() {
        if ch == '\n' {
            starts.push(idx + 1);
        }
    }
    let line_idx = starts
        .iter()
        .rposition(|start| *start <= cursor)
        .unwrap_or_default();
    let col = text[starts[line_idx]..cursor].chars().count();
    (starts, line_idx, col)
}

fn index_at_col(text: &str, start: usize, target_col: usize) -> usize {
    let slice = &text[start..];
    let limit = slice.find('\n').unwrap_or(slice.len());
    slice[..limit]
        .char_indices()
        .nth(target_col)
        .map(|(idx, _)| start + idx)
        .unwrap_or(start + limit)
}

fn truncate_text(text: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max <= 3 {
        return text.chars().take(max).collect();
    }
    let mut out: String = text.chars().take(max - 3).collect();
    out.push_str("...");
    out
}

fn field_lines(label: &str, field: &FieldValue, active: bool, p: &Palette) -> Vec<Line<'static>> {
    let label_style = Style::default().fg(p.dim).add_modifier(Modifier::BOLD);
    let value_style = Style::default().fg(if active { p.accent } else { p.fg });
    let prefix = format!("{}: ", label);
    let spacer = " ".repeat(prefix.chars().count());
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    text.split('\n')
        .enumerate()
        .map(|(idx, line)| {
            Line::from(vec![
                Span::styled(
                    if idx == 0 {
                        prefix.clone()
                    } else {
                        spacer.clone()
                    },
                    label_style,
                ),
                Span::styled(line.to_string(), value_style),
            ])
        })
        .collect()
}

fn format_elapsed(last: Instant) -> String {
    let secs = last.elapsed().as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn field_editing_moves_between_lines() {
        let mut field = FieldValue::new("ab\ncde");
        field.move_up();
        assert_eq!(field.cursor, 2);
        field.backspace();
        assert_eq!(field.value, "a\ncde");
        field.move_down();
        assert_eq!(field.cursor, 3);
        field.edit(press(KeyCode::Char('é')));
        assert_eq!(field.value, "a\ncéde");
        assert!(!field.edit(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL)));
    }

    #[test]
    fn submit_shortcuts() {
        assert!(is_submit(&KeyEvent::new(KeyCode::Enter, KeyModifiers::CONTROL)));
        assert!(is_submit(&KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL)));
        assert!(!is_submit(&press(KeyCode::Enter)));
        assert!(!is_submit(&press(KeyCode::Char('s'))));
    }

    #[test]
    fn bars_fill_in_proportion() {
        assert_eq!(bar(0.0, 4), "░░░░");
        assert_eq!(bar(50.0, 4), "██░░");
        assert_eq!(bar(100.0, 4), "████");
    }

    #[test]
    fn truncation_marks_cut_text() {
        assert_eq!(truncate_text("Meditate", 20), "Meditate");
        assert_eq!(truncate_text("Meditate daily", 8), "Medit...");
        assert_eq!(truncate_text("abc", 2), "ab");
        assert_eq!(truncate_text("abc", 0), "");
    }

    #[test]
    fn offset_follows_selection() {
        assert_eq!(adjust_offset(0, 0, 3, 0, 10), 0);
        assert_eq!(adjust_offset(5, 0, 3, 0, 10), 3);
        assert_eq!(adjust_offset(2, 5, 3, 0, 10), 2);
        assert_eq!(adjust_offset(9, 0, 3, 1, 10), 7);
    }

    #[test]
    fn form_fields_cycle_and_prefill() {
        let mut form = Form::new(FormKind::IdealSelf, &["Be kind", "health"]);
        assert_eq!(form.value(0), "Be kind");
        form.prev_field();
        assert_eq!(form.active, 1);
        form.next_field();
        assert_eq!(form.active, 0);
        let empty = Form::new(FormKind::AddHabit, &[]);
        assert_eq!(empty.fields.len(), 3);
        assert_eq!(empty.value(2), "");
    }
}

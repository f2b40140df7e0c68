//! Dashboard application state and event loop.

use super::views::Tab;
use crate::config::{self, Config};
use crate::dispatch::{self, Action, CommandRunner};
use crate::error::{Result, XMetaError};
use crate::launch;
use crate::reconcile::POLL_INTERVAL;
use crate::run_dir::{Artifact, RunDirectory, RunSummary};
use crate::status::TargetStatus;
use crate::trace::TraceDirection;
use crate::tree_view::TreeView;
use crate::view_state::ViewStateStore;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Tabs},
    Frame, Terminal,
};
use std::io::{self, Stdout};
use std::time::{Duration, Instant};

/// Cyan - headers and highlights
const COLOR_PRIMARY: Color = Color::Cyan;
const COLOR_SUCCESS: Color = Color::Green;
const COLOR_ERROR: Color = Color::Red;
/// Gray - secondary text
const COLOR_DIM: Color = Color::DarkGray;

const EVENT_POLL: Duration = Duration::from_millis(100);

/// Header row plus top and bottom borders.
const TABLE_CHROME: u16 = 3;

const TREE_WIDTHS: [Constraint; 5] = [
    Constraint::Length(12),
    Constraint::Min(20),
    Constraint::Length(10),
    Constraint::Length(19),
    Constraint::Length(19),
];

fn status_style(status: TargetStatus) -> Style {
    match status.color_rgb() {
        Some((r, g, b)) => Style::default().bg(Color::Rgb(r, g, b)).fg(Color::Black),
        None => Style::default(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Message {
    text: String,
    is_error: bool,
}

pub struct MonitorApp {
    config: Config,
    title: String,
    runner: Box<dyn CommandRunner>,
    runs: Vec<RunDirectory>,
    run_index: usize,
    main: TreeView,
    traces: Vec<TreeView>,
    all_runs_open: bool,
    summaries: Vec<RunSummary>,
    summary_cursor: usize,
    store: ViewStateStore,
    current_tab: Tab,
    message: Option<Message>,
    last_tick: Instant,
    viewport_height: usize,
    should_quit: bool,
}

impl MonitorApp {
    /// Build the dashboard bound to the first of `runs`.
    pub fn new(
        config: Config,
        runs: Vec<RunDirectory>,
        runner: Box<dyn CommandRunner>,
    ) -> Result<Self> {
        let first = runs
            .first()
            .cloned()
            .ok_or_else(|| XMetaError::RunNotFound(".".into()))?;
        let main = TreeView::active(first, None);

        Ok(Self {
            config,
            title: config::console_title(),
            runner,
            runs,
            run_index: 0,
            main,
            traces: Vec::new(),
            all_runs_open: false,
            summaries: Vec::new(),
            summary_cursor: 0,
            store: ViewStateStore::new(),
            current_tab: Tab::Main,
            message: None,
            last_tick: Instant::now(),
            viewport_height: 0,
            should_quit: false,
        })
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn current_tab(&self) -> Tab {
        self.current_tab
    }

    pub fn main_view(&self) -> &TreeView {
        &self.main
    }

    pub fn traces(&self) -> &[TreeView] {
        &self.traces
    }

    pub fn summaries(&self) -> &[RunSummary] {
        &self.summaries
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_ref().map(|m| m.text.as_str())
    }

    fn current_view(&self) -> Option<&TreeView> {
        match self.current_tab {
            Tab::Main => Some(&self.main),
            Tab::Trace(i) => self.traces.get(i),
            Tab::AllRuns => None,
        }
    }

    fn current_view_mut(&mut self) -> Option<&mut TreeView> {
        match self.current_tab {
            Tab::Main => Some(&mut self.main),
            Tab::Trace(i) => self.traces.get_mut(i),
            Tab::AllRuns => None,
        }
    }

    fn info(&mut self, text: impl Into<String>) {
        self.message = Some(Message {
            text: text.into(),
            is_error: false,
        });
    }

    fn error(&mut self, text: impl Into<String>) {
        self.message = Some(Message {
            text: text.into(),
            is_error: true,
        });
    }

    // ------------------------------------------------------------------
    // Polling
    // ------------------------------------------------------------------

    /// Reconcile once the poll interval has elapsed.
    pub fn on_tick(&mut self) {
        if self.last_tick.elapsed() >= POLL_INTERVAL {
            self.tick();
            self.last_tick = Instant::now();
        }
    }

    /// Reconcile every open view against its own run directory.
    pub fn tick(&mut self) {
        let mut changed = self.main.tick().len();
        for trace in &mut self.traces {
            changed += trace.tick().len();
        }
        if self.all_runs_open {
            self.refresh_summaries();
        }
        if changed > 0 {
            tracing::debug!(changed, "rows updated");
        }
    }

    fn refresh_summaries(&mut self) {
        let selected = self.summaries.get(self.summary_cursor).map(|s| s.run.clone());
        self.summaries = self.runs.iter().map(RunDirectory::latest_mark).collect();
        self.summary_cursor = selected
            .and_then(|name| self.summaries.iter().position(|s| s.run == name))
            .unwrap_or(0);
    }

    // ------------------------------------------------------------------
    // Keys
    // ------------------------------------------------------------------

    pub fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') => {
                self.should_quit = true;
                return;
            }
            KeyCode::Tab => {
                self.current_tab = self
                    .current_tab
                    .next(self.traces.len(), self.all_runs_open);
                return;
            }
            KeyCode::BackTab => {
                self.current_tab = self
                    .current_tab
                    .prev(self.traces.len(), self.all_runs_open);
                return;
            }
            KeyCode::Char('w') => {
                self.close_tab();
                return;
            }
            KeyCode::Char('a') => {
                self.open_all_runs();
                return;
            }
            KeyCode::Char('n') => {
                self.switch_run(1);
                return;
            }
            KeyCode::Char('p') => {
                self.switch_run(-1);
                return;
            }
            _ => {}
        }

        if self.current_tab == Tab::AllRuns {
            self.handle_all_runs_key(key);
        } else {
            self.handle_tree_key(key);
        }
    }

    fn handle_tree_key(&mut self, key: KeyCode) {
        let page = self.viewport_height.max(1) as isize;
        let height = self.viewport_height;

        if let Some(view) = self.current_view_mut() {
            match key {
                KeyCode::Up | KeyCode::Char('k') => view.move_cursor(-1),
                KeyCode::Down | KeyCode::Char('j') => view.move_cursor(1),
                KeyCode::PageUp => view.move_cursor(-page),
                KeyCode::PageDown => view.move_cursor(page),
                KeyCode::Home | KeyCode::Char('g') => view.set_cursor(0),
                KeyCode::End | KeyCode::Char('G') => view.cursor_to_end(),
                KeyCode::Enter => view.toggle_cursor_group(),
                KeyCode::Right | KeyCode::Left => {
                    if let Some(level) = view.cursor_target().map(|t| t.level.clone()) {
                        view.set_expanded(&level, key == KeyCode::Right);
                    }
                }
                KeyCode::Char(' ') => view.toggle_cursor_selection(),
                KeyCode::Char('L') => view.toggle_cursor_level_selection(),
                KeyCode::Esc => view.clear_selection(),
                _ => {}
            }
            view.ensure_cursor_visible(height);
        }

        match key {
            KeyCode::Char('r') => self.dispatch(Action::Run),
            KeyCode::Char('R') => self.dispatch(Action::RunAll),
            KeyCode::Char('x') => self.dispatch(Action::Stop),
            KeyCode::Char('s') => self.dispatch(Action::Skip),
            KeyCode::Char('u') => self.dispatch(Action::Unskip),
            KeyCode::Char('i') => self.dispatch(Action::Invalid),
            KeyCode::Char('e') => self.open_artifact(Artifact::Shell),
            KeyCode::Char('c') => self.open_artifact(Artifact::Command),
            KeyCode::Char('l') => self.open_artifact(Artifact::Log),
            KeyCode::Char('T') => self.open_terminal(),
            KeyCode::Char('y') => self.copy_target_name(),
            KeyCode::Char('U') => self.open_trace(TraceDirection::Up),
            KeyCode::Char('D') => self.open_trace(TraceDirection::Down),
            _ => {}
        }
    }

    fn handle_all_runs_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Up | KeyCode::Char('k') => {
                self.summary_cursor = self.summary_cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.summary_cursor + 1 < self.summaries.len() {
                    self.summary_cursor += 1;
                }
            }
            KeyCode::Enter => {
                if self.summary_cursor < self.runs.len() {
                    self.select_run(self.summary_cursor);
                }
            }
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Run switching
    // ------------------------------------------------------------------

    fn switch_run(&mut self, delta: isize) {
        if self.runs.len() < 2 {
            self.info("No other run directories found");
            return;
        }
        let len = self.runs.len() as isize;
        let index = (self.run_index as isize + delta).rem_euclid(len) as usize;
        self.select_run(index);
    }

    /// Bind the main tab to `runs[index]`, saving the old run's view state.
    fn select_run(&mut self, index: usize) {
        self.store.capture(&self.main);
        let run = self.runs[index].clone();
        self.main.rebind(run.clone(), self.store.get(&run));
        self.main.ensure_cursor_visible(self.viewport_height);
        self.run_index = index;
        self.current_tab = Tab::Main;
        tracing::info!(run = %run.root().display(), "switched run");
        self.info(format!("Run: {}", run.root().display()));
    }

    // ------------------------------------------------------------------
    // Tabs
    // ------------------------------------------------------------------

    fn open_all_runs(&mut self) {
        self.all_runs_open = true;
        self.refresh_summaries();
        self.current_tab = Tab::AllRuns;
    }

    fn close_tab(&mut self) {
        if !self.current_tab.is_closable() {
            self.info("The main tab cannot be closed");
            return;
        }
        match self.current_tab {
            Tab::Trace(i) => {
                if i < self.traces.len() {
                    self.traces.remove(i);
                }
                self.current_tab = match i.checked_sub(1) {
                    Some(prev) => Tab::Trace(prev),
                    None => Tab::Main,
                };
            }
            Tab::AllRuns => {
                self.all_runs_open = false;
                self.current_tab = match self.traces.len() {
                    0 => Tab::Main,
                    n => Tab::Trace(n - 1),
                };
            }
            Tab::Main => {}
        }
    }

    fn open_trace(&mut self, direction: TraceDirection) {
        let Some(view) = self.current_view() else {
            return;
        };
        let Some(target) = view.cursor_target().map(|t| t.name.clone()) else {
            return;
        };
        match TreeView::trace(view.run().clone(), &target, direction) {
            Some(trace) => {
                self.traces.push(trace);
                self.current_tab = Tab::Trace(self.traces.len() - 1);
            }
            None => self.info(format!("No {} trace for {}", direction.label(), target)),
        }
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    fn dispatch(&mut self, action: Action) {
        let dispatched = self.current_tab;
        let view = match dispatched {
            Tab::Main => &mut self.main,
            Tab::Trace(i) => match self.traces.get_mut(i) {
                Some(view) => view,
                None => return,
            },
            Tab::AllRuns => return,
        };
        let targets = if action.takes_targets() {
            view.action_targets()
        } else {
            Vec::new()
        };

        let Some(report) = dispatch::dispatch(self.runner.as_ref(), action, &targets, view) else {
            self.info("No target selected");
            return;
        };

        view.clear_selection();
        if report.rebuilt {
            let run = view.run().clone();
            self.rebuild_run_views(&run, dispatched);
        }

        let failed = !report.outcome.as_ref().is_some_and(|o| o.success());
        if failed {
            self.error(report.summary());
        } else {
            self.info(report.summary());
        }
    }

    /// Rebuild every view bound to `run` except the one on tab `skip`, which
    /// the dispatcher already rebuilt. Returns how many views were rebuilt.
    fn rebuild_run_views(&mut self, run: &RunDirectory, skip: Tab) -> usize {
        let mut rebuilt = 0;
        if skip != Tab::Main && self.main.run() == run {
            self.main.rebuild();
            rebuilt += 1;
        }
        for (i, view) in self.traces.iter_mut().enumerate() {
            if skip != Tab::Trace(i) && view.run() == run {
                view.rebuild();
                rebuilt += 1;
            }
        }
        rebuilt
    }

    fn copy_target_name(&mut self) {
        let Some(name) = self
            .current_view()
            .and_then(|view| view.cursor_target())
            .map(|t| t.name.clone())
        else {
            return;
        };
        match launch::copy_to_clipboard(&name) {
            Ok(()) => self.info(format!("Copied {}", name)),
            Err(e) => self.error(e.to_string()),
        }
    }

    fn open_artifact(&mut self, artifact: Artifact) {
        let Some(view) = self.current_view() else {
            return;
        };
        let Some(target) = view.cursor_target().map(|t| t.name.clone()) else {
            return;
        };
        match launch::open_artifact(&self.config.editor, view.run(), &target, artifact) {
            Ok(path) => self.info(format!("Opened {}", path.display())),
            Err(e) => self.error(e.to_string()),
        }
    }

    fn open_terminal(&mut self) {
        let Some(view) = self.current_view() else {
            return;
        };
        match launch::open_terminal(&self.config.terminal_command, view.run()) {
            Ok(()) => self.info(format!("Started {}", self.config.terminal_command)),
            Err(e) => self.error(e.to_string()),
        }
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Render the UI to the terminal.
    pub fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header with tabs
                Constraint::Min(0),    // Main content
                Constraint::Length(1), // Footer
            ])
            .split(frame.area());

        self.viewport_height = chunks[1].height.saturating_sub(TABLE_CHROME) as usize;
        let height = self.viewport_height;
        if let Some(view) = self.current_view_mut() {
            view.ensure_cursor_visible(height);
        }

        self.render_header(frame, chunks[0]);
        match self.current_view() {
            Some(view) => render_tree(frame, chunks[1], view),
            None => self.render_all_runs(frame, chunks[1]),
        }
        self.render_footer(frame, chunks[2]);
    }

    fn tab_title(&self, tab: Tab) -> String {
        match tab {
            Tab::Main => self.main.title(),
            Tab::Trace(i) => self
                .traces
                .get(i)
                .map(TreeView::title)
                .unwrap_or_else(|| tab.to_string()),
            Tab::AllRuns => tab.to_string(),
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let tabs = Tab::all(self.traces.len(), self.all_runs_open);
        let titles: Vec<Line> = tabs.iter().map(|t| Line::from(self.tab_title(*t))).collect();
        let selected_idx = tabs
            .iter()
            .position(|t| *t == self.current_tab)
            .unwrap_or(0);

        let widget = Tabs::new(titles)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" {} ", self.title))
                    .border_style(Style::default().fg(COLOR_PRIMARY)),
            )
            .select(selected_idx)
            .style(Style::default().fg(Color::White))
            .highlight_style(
                Style::default()
                    .fg(COLOR_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            );

        frame.render_widget(widget, area);
    }

    fn render_all_runs(&self, frame: &mut Frame, area: Rect) {
        let title = format!(" All Runs Status ({}) ", self.summaries.len());
        let rows: Vec<Row> = self
            .summaries
            .iter()
            .enumerate()
            .map(|(i, summary)| {
                let (target, status, time, style) = match (&summary.latest, &summary.note) {
                    (Some(mark), _) => (
                        mark.target.clone(),
                        mark.status.clone(),
                        mark.timestamp.clone(),
                        status_style(mark.target_status()),
                    ),
                    (None, note) => (
                        note.clone().unwrap_or_default(),
                        String::new(),
                        String::new(),
                        Style::default().fg(COLOR_DIM),
                    ),
                };
                let style = if i == self.summary_cursor {
                    style.add_modifier(Modifier::REVERSED)
                } else {
                    style
                };
                Row::new(vec![
                    Cell::from(summary.run.clone()),
                    Cell::from(target),
                    Cell::from(status),
                    Cell::from(time),
                ])
                .style(style)
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Min(20),
                Constraint::Min(20),
                Constraint::Length(10),
                Constraint::Length(19),
            ],
        )
        .header(header_row(&["Run", "Target", "Status", "Time"]))
        .block(Block::default().borders(Borders::ALL).title(title));

        frame.render_widget(table, area);
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let footer = match &self.message {
            Some(msg) => {
                let color = if msg.is_error { COLOR_ERROR } else { COLOR_SUCCESS };
                Paragraph::new(format!(" {} ", msg.text)).style(Style::default().fg(color))
            }
            None => {
                let help = if self.current_tab == Tab::AllRuns {
                    " Tab: switch | jk/↑↓: navigate | Enter: open run | w: close | q: quit "
                } else {
                    " Tab: switch | Enter: fold | Space/L: select | r/R/x/s/u/i: actions | e/c/l: files | U/D: trace | y: copy | n/p: run | q: quit "
                };
                Paragraph::new(help).style(Style::default().fg(COLOR_DIM))
            }
        };
        frame.render_widget(footer, area);
    }
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    Row::new(titles.iter().copied()).style(
        Style::default()
            .fg(COLOR_PRIMARY)
            .add_modifier(Modifier::BOLD),
    )
}

fn render_tree(frame: &mut Frame, area: Rect, view: &TreeView) {
    let forest = view.forest();
    let title = format!(
        " {} ({} targets) ",
        view.run().root().display(),
        forest.target_count()
    );

    if forest.is_empty() {
        let message = if view.run().has_dependency_file() {
            "No active targets"
        } else {
            "No dependency descriptor in this run directory"
        };
        let paragraph = Paragraph::new(message)
            .style(Style::default().fg(COLOR_DIM))
            .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(paragraph, area);
        return;
    }

    let height = area.height.saturating_sub(TABLE_CHROME) as usize;
    let rows: Vec<Row> = view
        .visible_rows()
        .iter()
        .enumerate()
        .skip(view.scroll())
        .take(height)
        .map(|(i, row)| {
            let target = forest.at(row.index);
            let group = &forest.groups()[row.index.group];
            let selected = view.is_selected(target);

            let level = if row.is_group_row {
                let marker = match (group.is_expandable(), view.is_expanded(&group.level)) {
                    (false, _) => "  ",
                    (true, true) => "▾ ",
                    (true, false) => "▸ ",
                };
                format!("{}{}", marker, group.level)
            } else {
                String::new()
            };
            let name = format!(
                "{}{}{}",
                if selected { "● " } else { "  " },
                if row.is_group_row { "" } else { "  " },
                target.name
            );

            let mut style = status_style(target.status);
            if selected {
                style = style.add_modifier(Modifier::BOLD);
            }
            if i == view.cursor() {
                style = style.add_modifier(Modifier::REVERSED);
            }

            Row::new(vec![
                Cell::from(level),
                Cell::from(name),
                Cell::from(target.status.as_str()),
                Cell::from(target.start_time.clone()),
                Cell::from(target.end_time.clone()),
            ])
            .style(style)
        })
        .collect();

    let table = Table::new(rows, TREE_WIDTHS)
        .header(header_row(&["Level", "Target", "Status", "Start Time", "End Time"]))
        .block(Block::default().borders(Borders::ALL).title(title));

    frame.render_widget(table, area);
}

/// Initialize the terminal for TUI mode.
pub fn init_terminal() -> io::Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

/// Restore the terminal to normal mode.
pub fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run the dashboard until the user quits.
pub fn run_monitor(config: Config, runs: Vec<RunDirectory>) -> Result<()> {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let mut app = MonitorApp::new(config, runs, Box::new(dispatch::ProcessRunner))?;
    let mut terminal = init_terminal()?;

    loop {
        terminal.draw(|frame| app.render(frame))?;

        if event::poll(EVENT_POLL)? {
            if let Event::Key(key) = event::read()? {
                // Only handle key press events (not release or repeat)
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code);
                }
            }
        }

        if app.should_quit() {
            break;
        }

        app.on_tick();
    }

    restore_terminal(&mut terminal)?;
    Ok(())
}

//! Live terminal view over a file's markers: every marker becomes a countdown
//! gauge, ticking once a second, with the contextual action bound to Space.

use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{prelude::*, widgets::*};
use std::{
    io,
    path::Path,
    time::{Duration, Instant},
};

use crate::Result;
use crate::binding::{self, TimerWidget};
use crate::host::{Clock, Document, SystemClock, TextDocument, TickScheduler, ViewMode};
use crate::marker;
use crate::notify::Notifier;
use crate::settings::Settings;
use crate::timer::{self, Action, Phase};

const POLL_RATE: Duration = Duration::from_millis(200);

enum KeyOutcome {
    Quit,
    Edited,
    Ignored,
}

struct WatchState {
    doc: TextDocument,
    widgets: Vec<TimerWidget>,
    scheduler: TickScheduler,
    selected: usize,
    duration: u32,
    view_mode: ViewMode,
}

impl WatchState {
    fn new(doc: TextDocument, now: i64, duration: u32) -> Self {
        let mut scheduler = TickScheduler::new();
        let widgets = binding::scan(&doc, &mut scheduler, now);
        Self {
            doc,
            widgets,
            scheduler,
            selected: 0,
            duration,
            view_mode: ViewMode::Rendered,
        }
    }

    /// The one action the contextual menu would offer for the selected marker.
    fn offered_action(&self, now: i64) -> Option<Action> {
        let widget = self.widgets.get(self.selected)?;
        let line = self.doc.line(widget.line())?;
        let marker = marker::decode(&line).map(|parsed| parsed.marker);
        match timer::phase(marker.as_ref(), now) {
            Phase::Running => Some(Action::Pause),
            Phase::Paused => Some(Action::Resume),
            Phase::Completed => Some(Action::Repeat),
            Phase::Unset => None,
        }
    }

    fn apply_selected(&mut self, action: Action, now: i64) {
        let Self { doc, widgets, scheduler, selected, duration, .. } = self;
        if let Some(widget) = widgets.get_mut(*selected) {
            widget.apply(action, doc, scheduler, now, *duration);
        }
    }

    fn teardown(&mut self) {
        let Self { widgets, scheduler, .. } = self;
        for widget in widgets.iter_mut() {
            widget.destroy(scheduler);
        }
    }
}

pub fn run(file: &Path, settings: &Settings) -> Result<()> {
    let clock = SystemClock;
    let doc = TextDocument::load(file)?;
    let mut state = WatchState::new(doc, clock.now(), settings.duration_seconds());
    let mut notifier = Notifier::new(settings);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = event_loop(&mut terminal, &mut state, &mut notifier, &clock, file);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut WatchState,
    notifier: &mut Notifier,
    clock: &dyn Clock,
    file: &Path,
) -> Result<()> {
    loop {
        let now = clock.now();
        terminal.draw(|f| render(f, state, now))?;

        if event::poll(POLL_RATE)? {
            if let Event::Key(key) = event::read()? {
                match handle_key(key, state, now) {
                    KeyOutcome::Quit => {
                        // No tick handle may outlive the view.
                        state.teardown();
                        return Ok(());
                    }
                    KeyOutcome::Edited => state.doc.save(file)?,
                    KeyOutcome::Ignored => {}
                }
            }
        }

        let fired = state.scheduler.fire_due(Instant::now());
        if !fired.is_empty() {
            let now = clock.now();
            let WatchState { doc, widgets, scheduler, duration, .. } = state;
            for widget in widgets.iter_mut() {
                let Some(id) = widget.interval() else { continue };
                if !fired.contains(&id) {
                    continue;
                }
                let view = widget.tick(scheduler, now, *duration);
                if view.just_completed {
                    notifier.completion(&widget.label(doc), widget.repeat_count());
                }
            }
        }
    }
}

fn handle_key(key: event::KeyEvent, state: &mut WatchState, now: i64) -> KeyOutcome {
    if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
    {
        return KeyOutcome::Quit;
    }

    match key.code {
        KeyCode::Down | KeyCode::Char('j') => {
            if !state.widgets.is_empty() {
                state.selected = (state.selected + 1).min(state.widgets.len() - 1);
            }
            KeyOutcome::Ignored
        }
        KeyCode::Up | KeyCode::Char('k') => {
            state.selected = state.selected.saturating_sub(1);
            KeyOutcome::Ignored
        }
        KeyCode::Char(' ') => match state.offered_action(now) {
            Some(action) => {
                state.apply_selected(action, now);
                KeyOutcome::Edited
            }
            None => KeyOutcome::Ignored,
        },
        KeyCode::Char('r') => {
            if state.widgets.is_empty() {
                KeyOutcome::Ignored
            } else {
                state.apply_selected(Action::Restart, now);
                KeyOutcome::Edited
            }
        }
        KeyCode::Char('v') => {
            state.view_mode = match state.view_mode {
                ViewMode::Rendered => ViewMode::Source,
                ViewMode::Source => ViewMode::Rendered,
            };
            KeyOutcome::Ignored
        }
        _ => KeyOutcome::Ignored,
    }
}

fn render(f: &mut Frame, state: &WatchState, now: i64) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1), Constraint::Length(3)])
        .split(f.size());

    let header = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(Span::styled(
            format!(
                " 🍅 POMARK · {} timers · {} ticking ",
                state.widgets.len(),
                state.scheduler.active_count()
            ),
            Style::default().fg(Color::LightRed).add_modifier(Modifier::BOLD),
        ));
    f.render_widget(header, chunks[0]);

    if state.widgets.is_empty() {
        f.render_widget(
            Paragraph::new("No timers in this file. Add one with `pomark add`.")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center),
            chunks[1],
        );
    } else {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(
                state
                    .widgets
                    .iter()
                    .map(|_| Constraint::Length(3))
                    .chain([Constraint::Min(0)])
                    .collect::<Vec<_>>(),
            )
            .split(chunks[1]);

        for (index, widget) in state.widgets.iter().enumerate() {
            if let Some(area) = rows.get(index) {
                render_gauge(f, state, widget, index == state.selected, now, *area);
            }
        }
    }

    let key = |text| Span::styled(text, Style::default().fg(Color::LightRed).add_modifier(Modifier::BOLD));
    let controls = Line::from(vec![
        key("Space"),
        Span::raw(" Pause/Resume/Repeat  •  "),
        key("R"),
        Span::raw(" Restart  •  "),
        key("↑↓"),
        Span::raw(" Select  •  "),
        key("V"),
        Span::raw(" Raw view  •  "),
        key("Q"),
        Span::raw(" Quit"),
    ]);
    f.render_widget(
        Paragraph::new(controls)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray)),
        chunks[2],
    );
}

fn render_gauge(f: &mut Frame, state: &WatchState, widget: &TimerWidget, selected: bool, now: i64, area: Rect) {
    let border = if selected { Color::LightRed } else { Color::DarkGray };

    if !widget.should_render(state.view_mode, &[]) {
        // Source view: the line as raw text, token highlighted.
        let text = state.doc.line(widget.line()).unwrap_or_default();
        let token = widget.token();
        let content = match text.find(token) {
            Some(at) => Line::from(vec![
                Span::raw(text[..at].to_string()),
                Span::styled(token.to_string(), Style::default().fg(Color::Yellow)),
                Span::raw(text[at + token.len()..].to_string()),
            ]),
            None => Line::from(text),
        };
        f.render_widget(
            Paragraph::new(content).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(border))
                    .title(format!(" line {} ", widget.line() + 1)),
            ),
            area,
        );
        return;
    }

    let view = widget.view(now, state.duration);
    let (status, color) = match view.phase {
        Phase::Running => ("▶", Color::Green),
        Phase::Paused => ("⏸", Color::Yellow),
        Phase::Completed => ("✔", Color::Blue),
        Phase::Unset => ("·", Color::DarkGray),
    };

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(border))
                .title(format!(" {} (line {}) ", widget.label(&state.doc), widget.line() + 1)),
        )
        .gauge_style(Style::default().fg(color).bg(Color::Black))
        .label(format!(
            "{} {:02}:{:02} · cycle {}",
            status,
            view.remaining / 60,
            view.remaining % 60,
            widget.repeat_count()
        ))
        .percent(view.percent.round() as u16);
    f.render_widget(gauge, area);
}

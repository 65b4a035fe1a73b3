//! Live binding between a marker in a document and its rendered widget: 1 s
//! ticks while running (read-only), exactly-once completion signalling, and
//! in-place marker rewrites that re-locate the token by content before editing.

use std::time::Duration;

use crate::host::{Document, IntervalId, Position, TickScheduler, ViewMode};
use crate::marker::{self, Marker, ParsedMarker};
use crate::timer::{self, Action, Phase};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// What a tick observed; handed to the renderer, never written back to the
/// document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickView {
    pub phase: Phase,
    pub remaining: u32,
    pub percent: f64,
    /// True exactly once, on the tick that crossed from Running to Completed.
    pub just_completed: bool,
}

#[derive(Debug)]
pub struct TimerWidget {
    line: usize,
    span_start: usize,
    /// The token verbatim, for re-location by content; offsets go stale as
    /// surrounding text is edited.
    token: String,
    marker: Marker,
    interval: Option<IntervalId>,
    last_phase: Phase,
}

impl TimerWidget {
    /// Binds to a marker already decoded from `line`. Starts ticking only if
    /// the timer is actually running; a marker that is already completed at
    /// mount does not fire a completion event.
    pub fn mount(
        line: usize,
        parsed: ParsedMarker,
        scheduler: &mut TickScheduler,
        now: i64,
    ) -> Self {
        let phase = timer::phase(Some(&parsed.marker), now);
        let interval = (phase == Phase::Running).then(|| scheduler.set_interval(TICK_PERIOD));
        Self {
            line,
            span_start: parsed.start,
            token: parsed.text,
            marker: parsed.marker,
            interval,
            last_phase: phase,
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn repeat_count(&self) -> u32 {
        self.marker.repeat_count()
    }

    pub fn interval(&self) -> Option<IntervalId> {
        self.interval
    }

    /// Display state for the current time; reading it changes nothing.
    pub fn view(&self, now: i64, duration: u32) -> TickView {
        TickView {
            phase: timer::phase(Some(&self.marker), now),
            remaining: timer::remaining_seconds(&self.marker, now, duration),
            percent: timer::percent_elapsed(&self.marker, now, duration),
            just_completed: false,
        }
    }

    /// Recomputes the display state for the current time. Stops the tick
    /// interval on the crossing into Completed so an idle finished timer does
    /// not keep a platform handle alive, and reports the crossing exactly once.
    pub fn tick(&mut self, scheduler: &mut TickScheduler, now: i64, duration: u32) -> TickView {
        let mut view = self.view(now, duration);
        view.just_completed = self.last_phase == Phase::Running && view.phase == Phase::Completed;
        if view.just_completed {
            self.stop_ticking(scheduler);
        }
        self.last_phase = view.phase;
        view
    }

    /// Applies a user action: re-locates the token in the live document,
    /// re-reads the marker there (the document is the source of truth for the
    /// repeat count), transitions, and rewrites exactly the old token's span.
    /// The caller's cursor position survives the edit.
    pub fn apply(
        &mut self,
        action: Action,
        doc: &mut dyn Document,
        scheduler: &mut TickScheduler,
        now: i64,
        duration: u32,
    ) {
        // Exact-substring search first; stale offsets are the best-effort fallback.
        let at = doc.find(&self.token).unwrap_or(Position {
            line: self.line,
            ch: self.span_start,
        });
        let live = doc
            .line(at.line)
            .and_then(|text| marker::decode(&text))
            .map(|parsed| parsed.marker)
            .unwrap_or_else(|| self.marker.clone());

        let next = timer::transition(action, &live, now, duration);
        let token = next.encode();

        let saved_cursor = doc.cursor();
        doc.replace_range(at.line, at.ch, at.ch + self.token.len(), &token);
        doc.set_cursor(saved_cursor);

        self.line = at.line;
        self.span_start = at.ch;
        self.token = token;
        self.marker = next;
        self.last_phase = timer::phase(Some(&self.marker), now);
        match self.last_phase {
            Phase::Running => {
                if self.interval.is_none() {
                    self.interval = Some(scheduler.set_interval(TICK_PERIOD));
                }
            }
            _ => self.stop_ticking(scheduler),
        }
    }

    /// Must be called when the widget leaves the screen; an uncancelled
    /// interval keeps firing against detached state.
    pub fn destroy(&mut self, scheduler: &mut TickScheduler) {
        self.stop_ticking(scheduler);
    }

    fn stop_ticking(&mut self, scheduler: &mut TickScheduler) {
        if let Some(id) = self.interval.take() {
            scheduler.clear_interval(id);
        }
    }

    /// The widget is suppressed (raw token shown) in source view and whenever a
    /// selection range touches the token's span.
    pub fn should_render(&self, view: ViewMode, selections: &[(Position, Position)]) -> bool {
        if view != ViewMode::Rendered {
            return false;
        }
        let from = (self.line, self.span_start);
        let to = (self.line, self.span_start + self.token.len());
        !selections.iter().any(|(s, e)| {
            let s = (s.line, s.ch);
            let e = (e.line, e.ch);
            if s <= from { e >= from } else { s <= to }
        })
    }

    /// The label shown beside the countdown: the line's text without the token.
    pub fn label(&self, doc: &dyn Document) -> String {
        doc.line(self.line)
            .map(|text| marker::strip_marker(&text))
            .unwrap_or_default()
    }
}

// Two widgets are interchangeable when they project the same timer state,
// regardless of where in the document they sit.
impl PartialEq for TimerWidget {
    fn eq(&self, other: &Self) -> bool {
        self.marker.repeat_count() == other.marker.repeat_count()
            && self.marker.end_epoch == other.marker.end_epoch
            && self.marker.elapsed() == other.marker.elapsed()
    }
}

/// Decodes every line of the document and mounts a widget per marker.
pub fn scan(doc: &dyn Document, scheduler: &mut TickScheduler, now: i64) -> Vec<TimerWidget> {
    let mut widgets = Vec::new();
    for index in 0..doc.line_count() {
        if let Some(text) = doc.line(index) {
            if let Some(parsed) = marker::decode(&text) {
                widgets.push(TimerWidget::mount(index, parsed, scheduler, now));
            }
        }
    }
    widgets
}

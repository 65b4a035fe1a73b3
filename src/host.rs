//! The collaborator surfaces the timer core talks to: a line-addressed mutable
//! document, a wall clock, a repeating-tick scheduler, and the view mode that
//! gates widget rendering. Production code uses [`TextDocument`] over a file;
//! tests build one from a string.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use std::{fs, io, path::Path};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    /// Byte offset within the line.
    pub ch: usize,
}

/// Whether the document is shown rendered or as raw source. Widgets only render
/// in the rendered view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Rendered,
    Source,
}

pub trait Document {
    fn line_count(&self) -> usize;
    fn line(&self, index: usize) -> Option<String>;

    /// Replaces the byte range `[start, end)` within one line. Callers pass
    /// spans they obtained from this document, so this is a programmatic edit;
    /// out-of-bounds spans are clamped rather than rejected.
    fn replace_range(&mut self, line: usize, start: usize, end: usize, text: &str);

    fn cursor(&self) -> Position;
    fn set_cursor(&mut self, pos: Position);

    /// Locates `needle` by exact substring match, scanning from the top.
    fn find(&self, needle: &str) -> Option<Position> {
        for index in 0..self.line_count() {
            if let Some(text) = self.line(index) {
                if let Some(ch) = text.find(needle) {
                    return Some(Position { line: index, ch });
                }
            }
        }
        None
    }
}

/// An in-memory, line-oriented document, optionally backed by a file on disk.
#[derive(Debug, Clone, Default)]
pub struct TextDocument {
    lines: Vec<String>,
    cursor: Position,
}

impl TextDocument {
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
            cursor: Position::default(),
        }
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        Ok(Self::from_text(&fs::read_to_string(path)?))
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let mut text = self.to_text();
        text.push('\n');
        fs::write(path, text)
    }

    pub fn to_text(&self) -> String {
        self.lines.join("\n")
    }
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    index = index.min(s.len());
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

impl Document for TextDocument {
    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn line(&self, index: usize) -> Option<String> {
        self.lines.get(index).cloned()
    }

    fn replace_range(&mut self, line: usize, start: usize, end: usize, text: &str) {
        let Some(target) = self.lines.get_mut(line) else {
            return;
        };
        let start = floor_char_boundary(target, start);
        let end = floor_char_boundary(target, end.max(start));
        target.replace_range(start..end, text);
    }

    fn cursor(&self) -> Position {
        self.cursor
    }

    fn set_cursor(&mut self, pos: Position) {
        self.cursor = pos;
    }
}

pub trait Clock {
    /// Current wall-clock time in Unix seconds.
    fn now(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

pub type IntervalId = usize;

/// Owns the repeating-tick handles, one per live running widget. The event loop
/// polls [`TickScheduler::fire_due`]; widgets hold an [`IntervalId`] and must
/// clear it on destroy or the interval keeps firing against detached state.
#[derive(Debug, Default)]
pub struct TickScheduler {
    next_id: IntervalId,
    intervals: HashMap<IntervalId, IntervalState>,
}

#[derive(Debug)]
struct IntervalState {
    period: Duration,
    due: Instant,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_interval(&mut self, period: Duration) -> IntervalId {
        let id = self.next_id;
        self.next_id += 1;
        self.intervals.insert(
            id,
            IntervalState {
                period,
                due: Instant::now() + period,
            },
        );
        id
    }

    pub fn clear_interval(&mut self, id: IntervalId) {
        self.intervals.remove(&id);
    }

    pub fn active_count(&self) -> usize {
        self.intervals.len()
    }

    /// Returns the intervals that have come due and reschedules each for its
    /// next period.
    pub fn fire_due(&mut self, now: Instant) -> Vec<IntervalId> {
        let mut fired = Vec::new();
        for (id, state) in &mut self.intervals {
            if state.due <= now {
                state.due = now + state.period;
                fired.push(*id);
            }
        }
        fired.sort_unstable();
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_scans_lines_top_down() {
        let doc = TextDocument::from_text("alpha\nbeta gamma\ngamma");
        assert_eq!(doc.find("gamma"), Some(Position { line: 1, ch: 5 }));
        assert_eq!(doc.find("missing"), None);
    }

    #[test]
    fn replace_range_edits_in_place() {
        let mut doc = TextDocument::from_text("keep %% old %% tail");
        doc.replace_range(0, 5, 14, "%% new %%");
        assert_eq!(doc.line(0).unwrap(), "keep %% new %% tail");
    }

    #[test]
    fn replace_range_clamps_stale_spans() {
        let mut doc = TextDocument::from_text("short");
        doc.replace_range(0, 3, 99, "!");
        assert_eq!(doc.line(0).unwrap(), "sho!");
        // A line that no longer exists is a silent no-op.
        doc.replace_range(7, 0, 1, "x");
        assert_eq!(doc.to_text(), "sho!");
    }

    #[test]
    fn replace_range_respects_char_boundaries() {
        let mut doc = TextDocument::from_text("café time");
        // Offset 4 falls inside the two-byte é; it snaps back instead of panicking.
        doc.replace_range(0, 4, 5, "");
        assert_eq!(doc.line(0).unwrap(), "caf time");
    }

    #[test]
    fn scheduler_fires_and_reschedules() {
        let mut sched = TickScheduler::new();
        let id = sched.set_interval(Duration::from_secs(1));
        assert_eq!(sched.active_count(), 1);
        assert!(sched.fire_due(Instant::now()).is_empty());

        let later = Instant::now() + Duration::from_secs(2);
        assert_eq!(sched.fire_due(later), vec![id]);
        // Rescheduled relative to the fire time, so it is not due again yet.
        assert!(sched.fire_due(later).is_empty());
    }

    #[test]
    fn cleared_interval_never_fires() {
        let mut sched = TickScheduler::new();
        let id = sched.set_interval(Duration::from_secs(1));
        sched.clear_interval(id);
        assert_eq!(sched.active_count(), 0);
        let later = Instant::now() + Duration::from_secs(5);
        assert!(sched.fire_due(later).is_empty());
    }
}

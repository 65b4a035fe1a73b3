//! Codec for the inline timer marker token.
//!
//! A marker is a short text token embedded anywhere in a line:
//!
//! ```text
//! %% time<repeat>?:<endEpochSeconds>(+<pausedElapsed>)? %%
//! ```
//!
//! `repeat` counts pomodoro cycles (defaults to 1 when omitted), the end epoch is
//! exactly 10 decimal digits of Unix seconds, and a positive `+<pausedElapsed>`
//! means the timer is paused with that many seconds already consumed.

use regex::Regex;
use std::sync::OnceLock;

static MARKER_REGEX: OnceLock<Regex> = OnceLock::new();

fn marker_regex() -> &'static Regex {
    MARKER_REGEX.get_or_init(|| {
        // Whitespace around the delimiters is tolerated but not required.
        Regex::new(r"%%\s*?time(\d*)?:(\d{10})(\+(\d{1,4}))?\s*?%%")
            .expect("marker pattern compiles")
    })
}

/// Timer state as serialized into the document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    /// Cycle count; decode tolerates its absence for hand-typed tokens.
    pub repeat: Option<u32>,
    /// Unix seconds at which the current running interval completes.
    pub end_epoch: i64,
    /// Seconds consumed before the timer was paused; absent or 0 while running.
    pub paused_elapsed: Option<u32>,
}

impl Marker {
    pub fn repeat_count(&self) -> u32 {
        self.repeat.unwrap_or(1).max(1)
    }

    pub fn elapsed(&self) -> u32 {
        self.paused_elapsed.unwrap_or(0)
    }

    /// Canonical token for this state. `repeat` and `+n` are always written out
    /// even though decode accepts tokens without them.
    pub fn encode(&self) -> String {
        encode(self.repeat_count(), self.end_epoch, self.elapsed())
    }
}

/// A marker found in a line, together with the span it occupies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMarker {
    pub marker: Marker,
    /// Byte offset of the token within the line.
    pub start: usize,
    pub end: usize,
    /// The matched token, verbatim, for later re-location by content.
    pub text: String,
}

/// Scans `line` for a marker token. Only the first match is honored; anything
/// after it is inert text.
pub fn decode(line: &str) -> Option<ParsedMarker> {
    let caps = marker_regex().captures(line)?;
    let whole = caps.get(0)?;

    let repeat = caps
        .get(1)
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse().ok());
    let end_epoch = caps.get(2)?.as_str().parse().ok()?;
    let paused_elapsed = caps.get(4).and_then(|m| m.as_str().parse().ok());

    Some(ParsedMarker {
        marker: Marker {
            repeat,
            end_epoch,
            paused_elapsed,
        },
        start: whole.start(),
        end: whole.end(),
        text: whole.as_str().to_string(),
    })
}

pub fn encode(repeat: u32, end_epoch: i64, paused_elapsed: u32) -> String {
    format!("%% time{repeat}:{end_epoch}+{paused_elapsed} %%")
}

/// The line's text with the marker token removed; what the rendered widget
/// shows next to the countdown, and what the notification body names.
pub fn strip_marker(line: &str) -> String {
    marker_regex().replace_all(line, "").trim().to_string()
}

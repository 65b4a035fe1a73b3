//! Discrete user-invokable actions against a single line: adding a fresh timer
//! and the phase-keyed contextual action. These operate on the line as
//! currently inspected, with no live re-location step.

use regex::Regex;
use std::sync::OnceLock;

use crate::host::Document;
use crate::marker;
use crate::timer::{self, Action, Phase};

static BLOCK_REF_REGEX: OnceLock<Regex> = OnceLock::new();

fn block_ref_regex() -> &'static Regex {
    BLOCK_REF_REGEX.get_or_init(|| {
        Regex::new(r"\^[A-Za-z0-9-]+$").expect("block ref pattern compiles")
    })
}

/// The single action offered for a line, decided by its marker's phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    AddTimer,
    Pause,
    Resume,
    Restart,
}

impl MenuAction {
    pub fn title(self) -> &'static str {
        match self {
            Self::AddTimer => "Add pomodoro timer",
            Self::Pause => "Pause pomodoro",
            Self::Resume => "Resume pomodoro",
            Self::Restart => "Restart pomodoro",
        }
    }
}

/// Exactly one action per line: no marker offers Add, a paused marker offers
/// Resume, a finished one Restart, a running one Pause.
pub fn contextual_action(line: &str, now: i64) -> MenuAction {
    let marker = marker::decode(line).map(|parsed| parsed.marker);
    match timer::phase(marker.as_ref(), now) {
        Phase::Unset => MenuAction::AddTimer,
        Phase::Paused => MenuAction::Resume,
        Phase::Completed => MenuAction::Restart,
        Phase::Running => MenuAction::Pause,
    }
}

/// Where a new marker goes: immediately before a trailing block-reference tag
/// if the line ends in one, otherwise at end of line.
pub fn insertion_point(line: &str) -> usize {
    block_ref_regex()
        .find(line)
        .map(|m| m.start())
        .unwrap_or(line.len())
}

/// The outcome of a line command; the CLI turns this into a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The edit was applied; carries the token now on the line.
    Applied(String),
    /// Add was requested but the line already carries a marker.
    AlreadyPresent,
    /// A transition was requested but the line has no marker.
    NoMarker,
    /// The requested transition does not apply to the marker's current phase;
    /// carries the action that would.
    WrongPhase(MenuAction),
}

/// Inserts a fresh running marker on `line_index`, padded with one space on
/// each side so it tokenizes apart from the surrounding text.
pub fn add_timer(doc: &mut dyn Document, line_index: usize, now: i64, duration: u32) -> Outcome {
    let Some(text) = doc.line(line_index) else {
        return Outcome::NoMarker;
    };
    if marker::decode(&text).is_some() {
        return Outcome::AlreadyPresent;
    }
    let token = marker::encode(1, now + i64::from(duration), 0);
    let at = insertion_point(&text);
    doc.replace_range(line_index, at, at, &format!(" {token} "));
    Outcome::Applied(token)
}

/// Applies `action` to the marker on `line_index`, rewriting its span in place.
/// Restart is accepted from any phase; Pause and Resume only from the phase
/// that offers them.
pub fn apply_action(
    doc: &mut dyn Document,
    line_index: usize,
    action: Action,
    now: i64,
    duration: u32,
) -> Outcome {
    let Some(text) = doc.line(line_index) else {
        return Outcome::NoMarker;
    };
    let Some(parsed) = marker::decode(&text) else {
        return Outcome::NoMarker;
    };

    let offered = contextual_action(&text, now);
    let valid = match action {
        Action::Pause => offered == MenuAction::Pause,
        Action::Resume => offered == MenuAction::Resume,
        Action::Repeat => offered == MenuAction::Restart,
        Action::Restart => true,
    };
    if !valid {
        return Outcome::WrongPhase(offered);
    }

    let next = timer::transition(action, &parsed.marker, now, duration);
    let token = next.encode();
    doc.replace_range(line_index, parsed.start, parsed.end, &token);
    Outcome::Applied(token)
}

/// Performs whichever action the contextual menu offers for the line.
pub fn apply_contextual(doc: &mut dyn Document, line_index: usize, now: i64, duration: u32) -> Outcome {
    let Some(text) = doc.line(line_index) else {
        return Outcome::NoMarker;
    };
    match contextual_action(&text, now) {
        MenuAction::AddTimer => add_timer(doc, line_index, now, duration),
        MenuAction::Pause => apply_action(doc, line_index, Action::Pause, now, duration),
        MenuAction::Resume => apply_action(doc, line_index, Action::Resume, now, duration),
        MenuAction::Restart => apply_action(doc, line_index, Action::Repeat, now, duration),
    }
}

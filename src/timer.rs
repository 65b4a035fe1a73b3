//! The timer state machine: phase derivation, countdown arithmetic, and the
//! transitions a user action produces. Everything here is pure; `now` is always
//! passed in as Unix seconds.

use crate::marker::Marker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No marker on the line yet.
    Unset,
    Running,
    Paused,
    Completed,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unset => "unset",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Pause,
    Resume,
    Restart,
    /// Re-engaging a finished timer; same arithmetic as Restart.
    Repeat,
}

/// Derives the phase. A positive paused-elapsed count always means Paused;
/// otherwise the end epoch against `now` decides, with `now == end` already
/// counting as Completed.
pub fn phase(marker: Option<&Marker>, now: i64) -> Phase {
    let Some(m) = marker else {
        return Phase::Unset;
    };
    if m.elapsed() > 0 {
        Phase::Paused
    } else if m.end_epoch > now {
        Phase::Running
    } else {
        Phase::Completed
    }
}

/// Seconds left on the countdown, never negative. While paused this is the
/// unconsumed part of the configured duration and does not depend on `now`.
pub fn remaining_seconds(m: &Marker, now: i64, duration: u32) -> u32 {
    match phase(Some(m), now) {
        Phase::Paused => duration.saturating_sub(m.elapsed()),
        Phase::Running => (m.end_epoch - now).clamp(0, i64::from(u32::MAX)) as u32,
        _ => 0,
    }
}

/// Display-only progress in [0, 100]. A zero duration reads as 0%.
pub fn percent_elapsed(m: &Marker, now: i64, duration: u32) -> f64 {
    if duration == 0 {
        return 0.0;
    }
    let remaining = f64::from(remaining_seconds(m, now, duration));
    (100.0 * (1.0 - remaining / f64::from(duration))).clamp(0.0, 100.0)
}

/// Computes the marker an action produces. Actions that are not valid for the
/// marker's current phase return it unchanged; the command surface only ever
/// offers the one valid action, so a no-op here means a stale invocation.
pub fn transition(action: Action, m: &Marker, now: i64, duration: u32) -> Marker {
    let current = phase(Some(m), now);
    match action {
        Action::Pause => {
            if current != Phase::Running {
                return m.clone();
            }
            let consumed = i64::from(duration) - (m.end_epoch - now);
            // End epoch is kept as a historical record; it is ignored while paused.
            Marker {
                repeat: Some(m.repeat_count()),
                end_epoch: m.end_epoch,
                paused_elapsed: Some(consumed.clamp(0, i64::from(duration)) as u32),
            }
        }
        Action::Resume => {
            if current != Phase::Paused {
                return m.clone();
            }
            let banked = m.elapsed();
            // A bank larger than the duration means the duration was shrunk in
            // settings while paused; grant a full fresh interval.
            let grant = if duration > banked { duration - banked } else { duration };
            Marker {
                repeat: Some(m.repeat_count()),
                end_epoch: now + i64::from(grant),
                paused_elapsed: Some(0),
            }
        }
        Action::Restart | Action::Repeat => {
            if action == Action::Repeat && current != Phase::Completed {
                return m.clone();
            }
            Marker {
                repeat: Some(m.repeat_count() + 1),
                end_epoch: now + i64::from(duration),
                paused_elapsed: Some(0),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::decode;

    const DURATION: u32 = 1500;

    fn running(end: i64) -> Marker {
        Marker { repeat: Some(1), end_epoch: end, paused_elapsed: Some(0) }
    }

    #[test]
    fn phase_totality() {
        assert_eq!(phase(None, 0), Phase::Unset);
        let m = running(1000);
        assert_eq!(phase(Some(&m), 999), Phase::Running);
        assert_eq!(phase(Some(&m), 1000), Phase::Completed);
        assert_eq!(phase(Some(&m), 1001), Phase::Completed);
        let p = Marker { paused_elapsed: Some(5), ..m };
        assert_eq!(phase(Some(&p), 999), Phase::Paused);
    }

    #[test]
    fn countdown_is_monotone_and_hits_zero_at_end() {
        let m = running(1000002000);
        let mut last = u32::MAX;
        for now in (1000000500..=1000002100).step_by(100) {
            let rem = remaining_seconds(&m, now, DURATION);
            assert!(rem <= last);
            last = rem;
        }
        assert_eq!(remaining_seconds(&m, 1000002000, DURATION), 0);
        assert_eq!(remaining_seconds(&m, 1000002001, DURATION), 0);
    }

    #[test]
    fn percent_stays_in_range() {
        let m = running(1000002000);
        for now in [999999000, 1000000500, 1000002000, 1000009999] {
            let pct = percent_elapsed(&m, now, DURATION);
            assert!((0.0..=100.0).contains(&pct), "pct {pct} out of range");
        }
        assert_eq!(percent_elapsed(&m, 1000000000, 0), 0.0);
    }

    #[test]
    fn paused_remaining_ignores_clock() {
        let m = Marker { repeat: Some(1), end_epoch: 1000001500, paused_elapsed: Some(100) };
        assert_eq!(remaining_seconds(&m, 1000000000, DURATION), 1400);
        assert_eq!(remaining_seconds(&m, 2000000000, DURATION), 1400);
    }

    #[test]
    fn elapsed_beyond_shrunk_duration_clamps_to_zero_remaining() {
        let m = Marker { repeat: Some(1), end_epoch: 1000001500, paused_elapsed: Some(900) };
        assert_eq!(remaining_seconds(&m, 1000000000, 600), 0);
        // Resuming grants a fresh interval in that case.
        let resumed = transition(Action::Resume, &m, 1000002000, 600);
        assert_eq!(resumed.end_epoch, 1000002000 + 600);
    }

    #[test]
    fn pause_resume_preserves_total_budget() {
        let m = running(1000001500);
        let paused = transition(Action::Pause, &m, 1000000100, DURATION);
        assert_eq!(paused.elapsed(), 100);
        // The pause length must not matter.
        for resume_at in [1000001401_i64, 1000002000, 1000099999] {
            let resumed = transition(Action::Resume, &paused, resume_at, DURATION);
            assert_eq!(resumed.elapsed(), 0);
            let fresh = (resumed.end_epoch - resume_at) as u32;
            assert_eq!(fresh + paused.elapsed(), DURATION);
        }
    }

    #[test]
    fn restart_increments_repeat_from_any_phase() {
        let m = running(1000001500);
        let restarted = transition(Action::Restart, &m, 1000000700, DURATION);
        assert_eq!(restarted.repeat, Some(2));
        assert_eq!(restarted.end_epoch, 1000000700 + 1500);
        assert_eq!(restarted.elapsed(), 0);

        let legacy = decode("%% time:1000001500 %%").unwrap().marker;
        let restarted = transition(Action::Restart, &legacy, 1000002000, DURATION);
        assert_eq!(restarted.repeat, Some(2));
    }

    #[test]
    fn invalid_actions_are_no_ops() {
        let done = running(1000);
        assert_eq!(transition(Action::Pause, &done, 2000, DURATION), done);
        assert_eq!(transition(Action::Resume, &done, 2000, DURATION), done);
        let live = running(1000002000);
        assert_eq!(transition(Action::Repeat, &live, 1000000000, DURATION), live);
    }

    #[test]
    fn pause_clamps_negative_elapsed_to_zero() {
        // Duration was raised after the timer started: consumed would be negative.
        let m = running(1000005000);
        let paused = transition(Action::Pause, &m, 1000000100, 1500);
        assert_eq!(paused.elapsed(), 0);
    }

    #[test]
    fn full_add_pause_resume_repeat_scenario() {
        let m = Marker { repeat: Some(1), end_epoch: 1000000000 + 1500, paused_elapsed: Some(0) };
        assert_eq!(m.encode(), "%% time1:1000001500+0 %%");

        let paused = transition(Action::Pause, &m, 1000000100, DURATION);
        assert_eq!(paused.encode(), "%% time1:1000001500+100 %%");

        let resumed = transition(Action::Resume, &paused, 1000002000, DURATION);
        assert_eq!(resumed.encode(), "%% time1:1000003400+0 %%");

        assert_eq!(phase(Some(&resumed), 1000003400), Phase::Completed);
        let repeated = transition(Action::Repeat, &resumed, 1000003400, DURATION);
        assert_eq!(repeated.encode(), "%% time2:1000004900+0 %%");
    }
}
